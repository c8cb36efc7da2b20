use thiserror::Error;

/// Stack error codes, one per `err_t` value the adapters can observe.
#[derive(Error, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Err {
    #[error("out of memory")]
    Mem,
    #[error("routing problem")]
    Rte,
    #[error("operation in progress")]
    InProgress,
    #[error("illegal value")]
    Val,
    #[error("address in use")]
    Use,
    #[error("already connected")]
    IsConn,
    #[error("not connected")]
    Conn,
    #[error("low-level netif error")]
    If,
    #[error("connection aborted")]
    Abrt,
    #[error("connection reset")]
    Rst,
    #[error("connection closed")]
    Clsd,
    #[error("illegal argument")]
    Arg,
}

pub type Result<T> = std::result::Result<T, Err>;
