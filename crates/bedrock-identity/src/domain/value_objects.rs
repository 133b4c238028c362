//! Value objects for the Identity context.

use std::fmt;

use bedrock_core::error::DomainError;
use bedrock_core::rng::DeterministicRng;
use serde::{Deserialize, Serialize};

const MIN_LENGTH: usize = 3;
const MAX_LENGTH: usize = 32;
const SUFFIX_LENGTH: usize = 5;
const SUFFIX_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// A normalized username: 3 to 32 characters of `[a-z0-9_]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Username(String);

impl Username {
    /// Slugifies `input` and validates the result.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the slug is too short or too
    /// long.
    pub fn parse(input: &str) -> Result<Self, DomainError> {
        let slug = slugify(input);
        validate(&slug)?;
        Ok(Self(slug))
    }

    /// Builds a username from `input` with a random five character suffix,
    /// e.g. `"Ana Lima"` becomes `ana_lima_x7k2p`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if the result violates the length
    /// bounds.
    pub fn generate_unique_from(
        input: &str,
        rng: &mut dyn DeterministicRng,
    ) -> Result<Self, DomainError> {
        let mut candidate = slugify(input);
        candidate.push('_');
        #[allow(clippy::cast_possible_truncation)]
        let last = (SUFFIX_ALPHABET.len() - 1) as u32;
        for _ in 0..SUFFIX_LENGTH {
            let index = rng.next_u32_range(0, last) as usize;
            candidate.push(char::from(SUFFIX_ALPHABET[index]));
        }
        validate(&candidate)?;
        Ok(Self(candidate))
    }

    /// Returns the username as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn validate(candidate: &str) -> Result<(), DomainError> {
    if candidate.len() < MIN_LENGTH {
        return Err(DomainError::Validation(format!(
            "username must be at least {MIN_LENGTH} characters"
        )));
    }
    if candidate.len() > MAX_LENGTH {
        return Err(DomainError::Validation(format!(
            "username must be at most {MAX_LENGTH} characters"
        )));
    }
    if !candidate
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(DomainError::Validation(
            "username can only contain lowercase letters, numbers, and underscores".into(),
        ));
    }
    Ok(())
}

fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    for c in input.trim().chars().flat_map(char::to_lowercase) {
        let c = fold_accent(c);
        if c.is_whitespace() || c == '_' {
            // Collapse runs of separators into one underscore.
            if !slug.ends_with('_') {
                slug.push('_');
            }
        } else if c.is_ascii_lowercase() || c.is_ascii_digit() {
            slug.push(c);
        }
    }
    slug.trim_matches('_').to_owned()
}

fn fold_accent(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}

/// Authorization role of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Regular account.
    User,
    /// Administrator.
    Admin,
}

impl Role {
    /// Stable string form used in persistence.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Admin => "ADMIN",
        }
    }

    /// Parses the persisted string form.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for unknown roles.
    pub fn parse(value: &str) -> Result<Self, DomainError> {
        match value {
            "USER" => Ok(Self::User),
            "ADMIN" => Ok(Self::Admin),
            other => Err(DomainError::Validation(format!("unknown role: {other}"))),
        }
    }
}
