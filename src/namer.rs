//! # Naming utilities
//!
//! Generation of the aliases used for derived tables in the compiled SQL.
//!
//! Aliases only have to be unique within one statement, so the counters live in an
//! explicit [`Aliases`] context threaded through SQL assembly rather than in a
//! process-wide static. One context may be shared by many threads.
//!

use std::sync::atomic::{AtomicUsize, Ordering};

pub const SUBQUERY: &str = "_s";
pub const UNION: &str = "_u";

/// Monotonic counters for subquery and union aliases
#[derive(Debug, Default)]
pub struct Aliases {
    subquery: AtomicUsize,
    union: AtomicUsize,
}

impl Aliases {
    pub fn new() -> Self {
        Aliases::default()
    }

    /// A fresh alias for a subquery in a FROM clause
    pub fn subquery(&self) -> String {
        new_name(SUBQUERY, &self.subquery)
    }

    /// A fresh alias for a UNION derived table
    pub fn union(&self) -> String {
        new_name(UNION, &self.union)
    }

    /// Number of subquery aliases produced so far
    pub fn subquery_count(&self) -> usize {
        self.subquery.load(Ordering::SeqCst)
    }

    /// Number of union aliases produced so far
    pub fn union_count(&self) -> usize {
        self.union.load(Ordering::SeqCst)
    }
}

fn new_name(prefix: &str, counter: &AtomicUsize) -> String {
    format!("{}{:x}", prefix, counter.fetch_add(1, Ordering::SeqCst))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{collections::HashSet, sync::Arc, thread};

    #[test]
    fn test_counters_are_independent() {
        let aliases = Aliases::new();
        assert_eq!(aliases.subquery(), "_s0");
        assert_eq!(aliases.subquery(), "_s1");
        assert_eq!(aliases.union(), "_u0");
        assert_eq!(aliases.subquery(), "_s2");
        assert_eq!(aliases.subquery_count(), 3);
        assert_eq!(aliases.union_count(), 1);
    }

    #[test]
    fn test_hex_names() {
        let aliases = Aliases::new();
        let names: Vec<String> = (0..17).map(|_| aliases.subquery()).collect();
        println!("names = {:?}", names);
        assert_eq!(names[10], "_sa");
        assert_eq!(names[16], "_s10");
    }

    #[test]
    fn test_concurrent_aliases_are_unique() {
        let aliases = Arc::new(Aliases::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let aliases = aliases.clone();
                thread::spawn(move || (0..500).map(|_| aliases.subquery()).collect::<Vec<_>>())
            })
            .collect();
        let mut seen = HashSet::new();
        for handle in handles {
            for name in handle.join().unwrap() {
                assert!(seen.insert(name));
            }
        }
        assert_eq!(seen.len(), 4000);
        assert_eq!(aliases.subquery_count(), 4000);
    }
}
