//! Output page ordering.
//!
//! A layout decides where each stamped copy lands in the output document.
//! Ordering is computed up front as a list of [`PageSlot`]s so the assembly
//! step is a single pass over it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Page ordering of the output document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum PageLayout {
    /// Option 1: every name's copy of page 1, then every name's copy of page 2, ...
    #[default]
    RoundRobin,
    /// Option 2: all pages for the first name, then all pages for the next, ...
    /// A blank page follows each name's block when the page count is odd.
    Grouped,
}

/// One page of the output document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSlot {
    /// Source page `page` stamped with name `name` (both 0-indexed).
    Stamped { name: usize, page: usize },
    /// Padding page closing the block of name `name`.
    Blank { name: usize },
}

impl PageLayout {
    pub const ALL: [Self; 2] = [Self::RoundRobin, Self::Grouped];

    /// Form value of this layout.
    pub const fn id(self) -> u8 {
        match self {
            Self::RoundRobin => 1,
            Self::Grouped => 2,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::RoundRobin => "Name each page in turn",
            Self::Grouped => "Name the whole document",
        }
    }

    pub const fn hint(self) -> &'static str {
        match self {
            Self::RoundRobin => "Good for printing daily worksheets and handing them out page by page",
            Self::Grouped => "Good for double-sided printing of one full copy per person",
        }
    }

    /// Output order for `page_count` source pages and `name_count` names.
    pub fn plan(self, page_count: usize, name_count: usize) -> Vec<PageSlot> {
        match self {
            Self::RoundRobin => round_robin(page_count, name_count),
            Self::Grouped => grouped(page_count, name_count),
        }
    }

    /// Number of pages [`plan`](Self::plan) produces.
    pub const fn output_page_count(self, page_count: usize, name_count: usize) -> usize {
        let stamped = page_count * name_count;
        match self {
            Self::RoundRobin => stamped,
            Self::Grouped if page_count % 2 == 1 => stamped + name_count,
            Self::Grouped => stamped,
        }
    }
}

fn round_robin(page_count: usize, name_count: usize) -> Vec<PageSlot> {
    let mut slots = Vec::with_capacity(page_count * name_count);
    for page in 0..page_count {
        for name in 0..name_count {
            slots.push(PageSlot::Stamped { name, page });
        }
    }
    slots
}

fn grouped(page_count: usize, name_count: usize) -> Vec<PageSlot> {
    let pad = page_count % 2 == 1;
    let mut slots = Vec::with_capacity((page_count + usize::from(pad)) * name_count);
    for name in 0..name_count {
        for page in 0..page_count {
            slots.push(PageSlot::Stamped { name, page });
        }
        if pad {
            slots.push(PageSlot::Blank { name });
        }
    }
    slots
}

impl TryFrom<u8> for PageLayout {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::RoundRobin),
            2 => Ok(Self::Grouped),
            other => Err(Error::InvalidLayout(other.to_string())),
        }
    }
}

impl From<PageLayout> for u8 {
    fn from(layout: PageLayout) -> Self {
        layout.id()
    }
}

impl FromStr for PageLayout {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        trimmed
            .parse::<u8>()
            .map_err(|_| Error::InvalidLayout(trimmed.to_string()))
            .and_then(Self::try_from)
    }
}

impl fmt::Display for PageLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RoundRobin => write!(f, "round robin"),
            Self::Grouped => write!(f, "grouped"),
        }
    }
}
