use std::borrow::Cow;

/// Errors that can occur during broadcast group operations.
#[leadhub_derive::leadhub_error]
pub enum GroupError {
    /// A member with the same id is already joined.
    #[error("Duplicate member{}: {message}", format_context(.context))]
    DuplicateMember { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// No member with the given id is joined.
    #[error("Unknown member{}: {message}", format_context(.context))]
    UnknownMember { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The group was shut down and accepts no further members or events.
    #[error("Group closed{}: {message}", format_context(.context))]
    Closed { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The member's mailbox is full; the event was not queued.
    #[error("Mailbox full{}: {message}", format_context(.context))]
    MailboxFull { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Mailbox capacity must be greater than zero.
    #[error("Invalid capacity{}: {message}", format_context(.context))]
    InvalidCapacity { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}
