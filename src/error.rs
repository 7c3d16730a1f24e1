use std::{fmt, io};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ErrorKind {
    Usage,
    ProcessState,
    Environment,
    Internal,
    Io,
    NotImplemented,
    Parse,
    Protocol,
    Sanity,
}

#[derive(Clone)]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, message: String) -> Self {
        Error {kind, message}
    }

    pub fn errno(context: &str) -> Self {
        let e = io::Error::last_os_error();
        Error {kind: ErrorKind::Io, message: format!("{}: {}", context, e)}
    }

    pub fn is_io_not_found(&self) -> bool {
        self.kind == ErrorKind::Io && self.message.contains("No such file or directory")
    }

    pub fn is_io_permission_denied(&self) -> bool {
        self.kind == ErrorKind::Io && (self.message.contains("Operation not permitted") || self.message.contains("Permission denied"))
    }

    pub fn is_not_implemented(&self) -> bool {
        self.kind == ErrorKind::NotImplemented
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}
impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}
impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Error {
        Error {kind: ErrorKind::Io, message: e.to_string()}
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[macro_export]
macro_rules! err {
    ($kind:ident, $($arg:tt)*) => {
        Err($crate::error::Error::new($crate::error::ErrorKind::$kind, format!($($arg)*)))
    };
}

#[macro_export]
macro_rules! errno_err {
    ($($arg:tt)*) => {
        Err($crate::error::Error::errno(&format!($($arg)*)))
    };
}
