//! Cyclic goblin name generator.

use crate::config::DEFAULT_NAMES;

/// Hands out names from a fixed cycle. After the first pass every name gets the
/// pass number appended: `yarr!`, `gnurgghhh!`, `fgumschak!`, `yarr! 1`, ...
#[derive(Debug, Clone)]
pub struct CyclicNames {
    names: Vec<String>,
    position: usize,
    iteration: u64,
}

impl CyclicNames {
    /// An empty list falls back to [`DEFAULT_NAMES`].
    pub fn new(names: Vec<String>) -> Self {
        let names = if names.is_empty() {
            DEFAULT_NAMES.iter().map(|name| name.to_string()).collect()
        } else {
            names
        };
        Self {
            names,
            position: 0,
            iteration: 0,
        }
    }

    pub fn generate(&mut self) -> String {
        let base = &self.names[self.position];
        let name = if self.iteration == 0 {
            base.clone()
        } else {
            format!("{base} {}", self.iteration)
        };

        self.position += 1;
        if self.position >= self.names.len() {
            self.position = 0;
            self.iteration += 1;
        }
        name
    }
}

impl Default for CyclicNames {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl Iterator for CyclicNames {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        Some(self.generate())
    }
}
