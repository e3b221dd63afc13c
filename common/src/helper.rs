/// Formats an error followed by every error in its `source()` chain.
///
/// Used to implement `Debug` on the service error enums, so that a logged error
/// shows what caused it and not only its top-level message.
pub fn error_chain_fmt(
    error: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{}\n", error)?;

    let mut current = error.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{}", cause)?;
        current = cause.source();
    }

    Ok(())
}
