//! Depth-1 pipeline register.

/// Holds one value for exactly one step.
///
/// `shift` stores its input and releases the value stored by the previous
/// call, so a chain of stages delays a stream by one step each. Registers
/// are plain owned values; nothing is shared between instances.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stage<T> {
    held: Option<T>,
    shifted: u64,
}

impl<T> Stage<T> {
    /// An empty register.
    pub fn new() -> Self {
        Self {
            held: None,
            shifted: 0,
        }
    }

    /// Store `input`, returning the previously held value.
    #[inline]
    pub fn shift(&mut self, input: T) -> Option<T> {
        self.shifted += 1;
        self.held.replace(input)
    }

    /// Release the held value, leaving the register empty.
    pub fn take(&mut self) -> Option<T> {
        self.held.take()
    }

    /// Peek at the held value.
    pub fn peek(&self) -> Option<&T> {
        self.held.as_ref()
    }

    /// Check if the register holds nothing.
    pub fn is_empty(&self) -> bool {
        self.held.is_none()
    }

    /// Values shifted in since construction.
    pub fn shifted(&self) -> u64 {
        self.shifted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_delays_by_one() {
        let mut stage = Stage::new();
        assert_eq!(stage.shift(1), None);
        assert_eq!(stage.shift(2), Some(1));
        assert_eq!(stage.peek(), Some(&2));
        assert_eq!(stage.take(), Some(2));
        assert!(stage.is_empty());
        assert_eq!(stage.take(), None);
        assert_eq!(stage.shifted(), 2);
    }

    #[test]
    fn test_stages_chain() {
        let mut first = Stage::new();
        let mut second = Stage::new();
        let mut out = Vec::new();

        for v in 0..4 {
            if let Some(x) = first.shift(v) {
                if let Some(y) = second.shift(x) {
                    out.push(y);
                }
            }
        }
        while let Some(x) = first.take() {
            if let Some(y) = second.shift(x) {
                out.push(y);
            }
        }
        out.extend(second.take());

        assert_eq!(out, vec![0, 1, 2, 3]);
    }
}
