use leadhub_derive::leadhub_error;
use std::borrow::Cow;

#[leadhub_error]
pub enum FrameError {
    #[error("Decode failure{}: {source}", format_context(.context))]
    Decode {
        #[source]
        source: std::num::ParseIntError,
        context: Option<Cow<'static, str>>,
    },

    #[error("Unknown event{}: {message}", format_context(.context))]
    UnknownEvent { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn parse(raw: &str) -> Result<u32, FrameError> {
    raw.parse::<u32>().context("parsing frame length")
}

fn main() {
    let err = parse("nope").unwrap_err();
    assert!(err.to_string().starts_with("Decode failure (parsing frame length)"));

    let err: FrameError = "boom".into();
    assert_eq!(err.to_string(), "Internal error: boom");

    let err = Err::<(), _>(FrameError::UnknownEvent { message: "lead:gone".into(), context: None })
        .context("relay")
        .unwrap_err();
    assert_eq!(err.to_string(), "Unknown event (relay): lead:gone");
}
