//! Placeholder parsing and substitution for build command templates.
//!
//! Target tables are static, but the values they reference (which `make` to
//! run, where the out-of-tree build lives, how many jobs) are only known once
//! the command line has been parsed. Templates carry `$${name}` placeholders
//! that are resolved against a [`Resolver`] right before a step runs.
//!
//! # Placeholder Formats
//!
//! - `$${make}` - the build tool program
//! - `$${out}` - the build output directory
//! - `$${jobs}` - number of parallel jobs
//! - `$${deploy}` - the network-boot deploy directory
//! - `$${modules_root}` - root filesystem that receives installed modules
//!
//! # Shell Variables
//!
//! Single `$` characters pass through unchanged, so `$HOME` and friends reach
//! the shell untouched.
//!
//! # Escaping
//!
//! Use `$$$` before `{` to produce a literal `$${` sequence.
//!
//! # Example
//!
//! ```
//! use rkbuild_lib::template::{parse, Placeholder, Segment};
//!
//! let segments = parse("$${make} O=$${out} dtbs").unwrap();
//! assert_eq!(segments, vec![
//!     Segment::Placeholder(Placeholder::Make),
//!     Segment::Literal(" O=".to_string()),
//!     Segment::Placeholder(Placeholder::Out),
//!     Segment::Literal(" dtbs".to_string()),
//! ]);
//! ```

use std::fmt;

use thiserror::Error;

/// A parsed placeholder reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
  Make,
  Out,
  Jobs,
  Deploy,
  ModulesRoot,
}

impl Placeholder {
  fn from_name(name: &str) -> Option<Self> {
    match name {
      "make" => Some(Self::Make),
      "out" => Some(Self::Out),
      "jobs" => Some(Self::Jobs),
      "deploy" => Some(Self::Deploy),
      "modules_root" => Some(Self::ModulesRoot),
      _ => None,
    }
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Make => "make",
      Self::Out => "out",
      Self::Jobs => "jobs",
      Self::Deploy => "deploy",
      Self::ModulesRoot => "modules_root",
    }
  }
}

impl fmt::Display for Placeholder {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// A segment of parsed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
  /// Literal text (no placeholders)
  Literal(String),

  /// A placeholder to be resolved
  Placeholder(Placeholder),
}

/// Errors that can occur during template parsing or resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
  #[error("unclosed placeholder at position {0}")]
  Unclosed(usize),

  #[error("unknown placeholder: {0}")]
  Unknown(String),

  #[error("no value for placeholder '{0}'")]
  Unresolved(Placeholder),
}

/// Supplies values for placeholders during substitution.
pub trait Resolver {
  fn resolve(&self, placeholder: Placeholder) -> Result<&str, TemplateError>;
}

/// Parse a template into literal and placeholder segments.
///
/// # Errors
///
/// Returns an error if a placeholder is unclosed or names an unknown value.
pub fn parse(input: &str) -> Result<Vec<Segment>, TemplateError> {
  let mut segments = Vec::new();
  let mut literal = String::new();
  let mut chars = input.char_indices().peekable();

  while let Some((pos, ch)) = chars.next() {
    if ch != '$' {
      literal.push(ch);
      continue;
    }

    match chars.peek() {
      Some((_, '$')) => {
        chars.next();

        match chars.peek() {
          Some((_, '$')) => {
            chars.next();

            match chars.peek() {
              Some((_, '{')) => {
                // $$${ -> literal $${
                literal.push_str("$${");
                chars.next();
              }
              _ => literal.push_str("$$$"),
            }
          }
          Some((_, '{')) => {
            chars.next();

            if !literal.is_empty() {
              segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }

            let mut name = String::new();
            let mut found_close = false;

            for (_, c) in chars.by_ref() {
              if c == '}' {
                found_close = true;
                break;
              }
              name.push(c);
            }

            if !found_close {
              return Err(TemplateError::Unclosed(pos));
            }

            let placeholder = Placeholder::from_name(name.trim()).ok_or(TemplateError::Unknown(name))?;
            segments.push(Segment::Placeholder(placeholder));
          }
          _ => literal.push_str("$$"),
        }
      }
      _ => literal.push('$'),
    }
  }

  if !literal.is_empty() {
    segments.push(Segment::Literal(literal));
  }

  Ok(segments)
}

/// Parse and substitute in one step.
///
/// # Errors
///
/// Returns an error if parsing fails or if any placeholder cannot be resolved.
pub fn substitute(input: &str, resolver: &impl Resolver) -> Result<String, TemplateError> {
  let segments = parse(input)?;
  substitute_segments(&segments, resolver)
}

/// Substitute placeholders in pre-parsed segments.
pub fn substitute_segments(segments: &[Segment], resolver: &impl Resolver) -> Result<String, TemplateError> {
  let mut result = String::new();

  for segment in segments {
    match segment {
      Segment::Literal(s) => result.push_str(s),
      Segment::Placeholder(p) => result.push_str(resolver.resolve(*p)?),
    }
  }

  Ok(result)
}
