use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::shared::error::EngineError;

/// Target genres the transformation engine has a profile for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Genre {
    Rock,
    Electronic,
    Hiphop,
    Classical,
    Country,
    Jazz,
    Reggae,
}

impl Genre {
    pub const ALL: &[Genre] = &[
        Genre::Rock,
        Genre::Electronic,
        Genre::Hiphop,
        Genre::Classical,
        Genre::Country,
        Genre::Jazz,
        Genre::Reggae,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Genre::Rock => "rock",
            Genre::Electronic => "electronic",
            Genre::Hiphop => "hiphop",
            Genre::Classical => "classical",
            Genre::Country => "country",
            Genre::Jazz => "jazz",
            Genre::Reggae => "reggae",
        }
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Genre {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rock" => Ok(Genre::Rock),
            "electronic" => Ok(Genre::Electronic),
            "hiphop" | "hip-hop" | "hip_hop" => Ok(Genre::Hiphop),
            "classical" => Ok(Genre::Classical),
            "country" => Ok(Genre::Country),
            "jazz" => Ok(Genre::Jazz),
            "reggae" => Ok(Genre::Reggae),
            _ => Err(EngineError::UnknownGenre(s.to_string())),
        }
    }
}
