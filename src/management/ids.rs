/// Monotonic id source. One instance per id space, owned by whoever issues
/// the ids.
#[derive(Debug, Clone, Default)]
pub struct IdSequence {
    most_recent: u32,
}

impl IdSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> u32 {
        self.most_recent += 1;
        self.most_recent
    }

    /// Last id handed out, 0 before the first.
    pub fn most_recent(&self) -> u32 {
        self.most_recent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_start_at_one_and_increase() {
        let mut ids = IdSequence::new();
        assert_eq!(ids.most_recent(), 0);
        assert_eq!(ids.next_id(), 1);
        assert_eq!(ids.next_id(), 2);
        assert_eq!(ids.most_recent(), 2);
    }
}
