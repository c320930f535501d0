//! Event-name encodings.
//!
//! Names are numbered the way a label encoder does it: distinct values
//! sorted, then numbered from zero. Each partition gets its own encoding
//! type, so a code from one partition cannot be compared with a code from
//! the other.

use std::marker::PhantomData;

pub trait EncodingScope {
    const LABEL: &'static str;
}

/// Names of course-identified events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Identified {}

/// Names of events without a course id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Unidentified {}

impl EncodingScope for Identified {
    const LABEL: &'static str = "identified";
}

impl EncodingScope for Unidentified {
    const LABEL: &'static str = "unidentified";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NameCode<S> {
    value: usize,
    scope: PhantomData<S>,
}

impl<S> NameCode<S> {
    fn new(value: usize) -> Self {
        Self {
            value,
            scope: PhantomData,
        }
    }

    pub fn value(&self) -> usize {
        self.value
    }
}

#[derive(Debug, Clone)]
pub struct NameEncoding<S> {
    names: Vec<String>,
    scope: PhantomData<S>,
}

impl<S: EncodingScope> NameEncoding<S> {
    pub fn fit<'a, I>(names: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut names: Vec<String> = names.into_iter().map(str::to_string).collect();
        names.sort();
        names.dedup();

        Self {
            names,
            scope: PhantomData,
        }
    }

    /// Fit on `names` and return the code of every input, in input order.
    pub fn fit_transform(names: &[&str]) -> (Self, Vec<NameCode<S>>) {
        let encoding = Self::fit(names.iter().copied());
        let codes = names
            .iter()
            .map(|name| NameCode::new(encoding.position(name)))
            .collect();
        (encoding, codes)
    }

    pub fn code(&self, name: &str) -> Option<NameCode<S>> {
        self.names
            .binary_search_by(|known| known.as_str().cmp(name))
            .ok()
            .map(NameCode::new)
    }

    pub fn max_code(&self) -> Option<NameCode<S>> {
        self.names.len().checked_sub(1).map(NameCode::new)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn scope_label(&self) -> &'static str {
        S::LABEL
    }

    // Only called for names the encoding was fitted on, where the search hits.
    fn position(&self, name: &str) -> usize {
        match self
            .names
            .binary_search_by(|known| known.as_str().cmp(name))
        {
            Ok(index) | Err(index) => index,
        }
    }
}
