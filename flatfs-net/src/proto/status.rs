use std::fmt;

use flatfs::FsError;

/// Status codes carried on the first line of every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    BadRequest,
    NotADirectory,
    IsADirectory,
    AlreadyExists,
    NotFound,
    NameTooLong,
    DiskFull,
    DirectoryFull,
    NotEmpty,
    AppendTooLarge,
}

const ALL: [Status; 11] = [
    Status::Ok,
    Status::BadRequest,
    Status::NotADirectory,
    Status::IsADirectory,
    Status::AlreadyExists,
    Status::NotFound,
    Status::NameTooLong,
    Status::DiskFull,
    Status::DirectoryFull,
    Status::NotEmpty,
    Status::AppendTooLarge,
];

impl Status {
    pub fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::BadRequest => 400,
            Status::NotADirectory => 500,
            Status::IsADirectory => 501,
            Status::AlreadyExists => 502,
            Status::NotFound => 503,
            Status::NameTooLong => 504,
            Status::DiskFull => 505,
            Status::DirectoryFull => 506,
            Status::NotEmpty => 507,
            Status::AppendTooLarge => 508,
        }
    }

    pub fn phrase(self) -> &'static str {
        match self {
            Status::Ok => "OK",
            Status::BadRequest => "Bad request",
            Status::NotADirectory => "File is not a directory",
            Status::IsADirectory => "File is a directory",
            Status::AlreadyExists => "File exists",
            Status::NotFound => "File does not exist",
            Status::NameTooLong => "File name is too long",
            Status::DiskFull => "Disk is full",
            Status::DirectoryFull => "Directory is full",
            Status::NotEmpty => "Directory is not empty",
            Status::AppendTooLarge => "Append exceeds maximum file size",
        }
    }

    pub fn from_code(code: u16) -> Option<Status> {
        ALL.iter().copied().find(|status| status.code() == code)
    }

    /// The status a client sees for an engine error. Faults have none; the
    /// session treats them as fatal instead.
    pub fn from_error(err: &FsError) -> Option<Status> {
        let status = match err {
            FsError::NotADirectory => Status::NotADirectory,
            FsError::IsADirectory => Status::IsADirectory,
            FsError::AlreadyExists => Status::AlreadyExists,
            FsError::NotFound => Status::NotFound,
            FsError::NameTooLong => Status::NameTooLong,
            FsError::InvalidName => Status::BadRequest,
            FsError::DiskFull => Status::DiskFull,
            FsError::DirectoryFull => Status::DirectoryFull,
            FsError::NotEmpty => Status::NotEmpty,
            FsError::AppendTooLarge => Status::AppendTooLarge,
            FsError::Corrupt(_)
            | FsError::Unformatted
            | FsError::InvalidBlock(_)
            | FsError::Io(_) => return None,
        };
        Some(status)
    }

    pub fn is_ok(self) -> bool {
        self == Status::Ok
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.phrase())
    }
}
