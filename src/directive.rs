//! Line parser for the playmacro script language.
//!
//! Parsing is line-local and stateless: each script line maps to at most one
//! [`Directive`], independent of anything parsed before it.

use anyhow::{Context as _, Result, anyhow};

/// Display name used for `#NAME#` substitution when the caller supplies none.
pub const DEFAULT_DISPLAY_NAME: &str = "John Doe";

/// Placeholder token substituted with the display name in plain command lines.
pub const NAME_TOKEN: &str = "#NAME#";

/// One parsed unit of script behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Pause for the given number of milliseconds before continuing.
    Wait(u64),
    /// Restart the script from its first line.
    Loop,
    /// Request termination of the current operational activity.
    ///
    /// Consumed by the run controller, never sent to the remote sink.
    Stop,
    /// Emit a media-add command built from the current recording filename.
    AddMedia,
    /// Send the resolved text verbatim to the remote sink.
    Send(String),
}

/// Parse one script line into a directive.
///
/// The line is trimmed first. Blank lines yield `None`. Any non-blank line
/// that matches no directive marker becomes [`Directive::Send`] with every
/// `#NAME#` occurrence replaced by `display_name`.
///
/// # Errors
///
/// Returns an error if a `#WAIT` line carries a malformed or negative
/// duration argument.
///
/// # Example
///
/// ```
/// use playmacro::directive::{Directive, parse_line};
///
/// let d = parse_line("#WAIT 500", "Jane").unwrap();
/// assert_eq!(d, Some(Directive::Wait(500)));
/// ```
pub fn parse_line(line: &str, display_name: &str) -> Result<Option<Directive>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    if let Some(arg) = line.strip_prefix("#WAIT") {
        let ms: u64 = arg
            .trim()
            .parse()
            .with_context(|| format!("Invalid #WAIT duration: {}", arg.trim()))?;
        return Ok(Some(Directive::Wait(ms)));
    }
    if line.starts_with("#LOOP") {
        return Ok(Some(Directive::Loop));
    }
    if line.starts_with("#STOP") {
        return Ok(Some(Directive::Stop));
    }
    if line.starts_with("#ADD") {
        return Ok(Some(Directive::AddMedia));
    }
    Ok(Some(Directive::Send(line.replace(NAME_TOKEN, display_name))))
}

/// Build the media-add command for the current recording file.
///
/// Command shape expected by the playout server's consumer layer.
pub fn add_media_command(file: &str) -> String {
    format!("ADD 1 FILE {file} -vcodec libx264 -preset ultrafast -crf 20")
}

/// Build the finalize command that closes out a recording file.
pub fn remove_media_command(file: &str) -> String {
    format!("REMOVE 1 FILE {file}")
}

/// Parse a full script text eagerly, for validation or tooling.
///
/// The runner itself parses lazily line by line so that a parse error aborts
/// a run at the offending line; this helper exists for callers that want to
/// vet a script up front.
///
/// # Errors
///
/// Returns an error naming the first malformed line.
pub fn parse_str(content: &str, display_name: &str) -> Result<Vec<Directive>> {
    let mut directives = Vec::new();
    for (line_num, line) in content.lines().enumerate() {
        let parsed = parse_line(line, display_name)
            .map_err(|e| anyhow!("Failed to parse line {}: {e}", line_num + 1))?;
        if let Some(d) = parsed {
            directives.push(d);
        }
    }
    Ok(directives)
}
