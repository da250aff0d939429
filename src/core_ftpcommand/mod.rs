// Here's the list of the FTP commands implemented
pub mod cdup;
pub mod cwd;
pub mod denied;
pub mod handlers;
pub mod help;
pub mod list;
pub mod mdtm;
pub mod mode;
pub mod noop;
pub mod pass;
pub mod pwd;
pub mod quit;
pub mod rest;
pub mod retr;
pub mod size;
pub mod syst;
pub mod type_;
pub mod user;

// Command line parsing
pub mod ftpcommand;

// The utils and common functions are here
pub mod utils;
