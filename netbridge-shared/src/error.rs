#![allow(dead_code)]

use std::string::FromUtf8Error;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Result type handed across the adapter boundary.
///
/// `Ok` is the success outcome; every failure is one of the closed set of
/// [`ErrorCode`] values.
pub type NetResult<T> = std::result::Result<T, ErrorCode>;

/// The only outcomes an adapter may hand to a completion event.
///
/// Stack specific failures are translated into this set at the adapter
/// boundary; nothing finer grained crosses into the device SDK.
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    #[error("out of memory")]
    OutOfMemory,
    #[error("aborted")]
    Aborted,
    /// Graceful remote close, read side only.
    #[error("end of file")]
    Eof,
    /// Non-blocking poll found nothing. Never resolved into a completion.
    #[error("try again")]
    Again,
    #[error("operation in progress")]
    OperationInProgress,
    #[error("unknown error")]
    Unknown,
    #[error("socket error")]
    SocketError,
}

#[derive(Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    //DNS message errors
    #[error("insufficient data for base length type")]
    ErrBaseLen,
    #[error("insufficient data for calculated length type")]
    ErrCalcLen,
    #[error("segment prefix is reserved")]
    ErrReserved,
    #[error("too many pointers (>10)")]
    ErrTooManyPtr,
    #[error("invalid pointer")]
    ErrInvalidPtr,
    #[error("insufficient data for resource body length")]
    ErrResourceLen,
    #[error("segment length too long")]
    ErrSegTooLong,
    #[error("zero length segment")]
    ErrZeroSegLen,
    #[error("resource length too long")]
    ErrResTooLong,
    #[error("too many Questions to pack (>65535)")]
    ErrTooManyQuestions,
    #[error("too many Answers to pack (>65535)")]
    ErrTooManyAnswers,
    #[error("too many Authorities to pack (>65535)")]
    ErrTooManyAuthorities,
    #[error("too many Additionals to pack (>65535)")]
    ErrTooManyAdditionals,
    #[error("name is not in canonical format (it must end with a .)")]
    ErrNonCanonicalName,
    #[error("character string exceeds maximum length (255)")]
    ErrStringTooLong,
    #[error("packet does not fit in the output buffer")]
    ErrPacketTooBig,
    #[error("service is not published")]
    ErrNotPublished,

    //Thread errors
    #[error("task could not be created")]
    ErrTaskCreate,
    #[error("thread is already running")]
    ErrThreadAlreadyRunning,

    //Configuration errors
    #[error("invalid configuration: {0}")]
    ErrInvalidConfig(String),

    #[error("utf8: {0}")]
    Utf8(#[from] FromUtf8Error),
}

impl From<&Error> for ErrorCode {
    fn from(e: &Error) -> Self {
        match e {
            Error::ErrTaskCreate | Error::ErrPacketTooBig => ErrorCode::OutOfMemory,
            _ => ErrorCode::Unknown,
        }
    }
}

impl From<Error> for ErrorCode {
    fn from(e: Error) -> Self {
        ErrorCode::from(&e)
    }
}
