/// Default bound on nesting depth for one top-level call.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// A Cursor for walking a tree with context: where we are and how deep.
#[derive(Debug, Clone)]
pub struct Cursor {
    path_stack: Vec<String>,
    depth: usize,
    max_depth: usize,
}

impl Default for Cursor {
    fn default() -> Self {
        Cursor::with_limit(DEFAULT_MAX_DEPTH)
    }
}

impl Cursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(max_depth: usize) -> Self {
        Cursor {
            path_stack: Vec::new(),
            depth: 0,
            max_depth,
        }
    }

    /// Enter a named segment (pushes to path stack).
    ///
    /// Fails without pushing when the depth limit would be exceeded.
    pub fn enter(&mut self, segment: impl Into<String>) -> crate::Result<()> {
        if self.depth >= self.max_depth {
            return Err(crate::Error::DepthLimitExceeded {
                limit: self.max_depth,
                path: self.path(),
            });
        }
        self.path_stack.push(segment.into());
        self.depth += 1;
        Ok(())
    }

    /// Exit the current segment (pops from path stack).
    pub fn exit(&mut self) {
        if self.path_stack.pop().is_some() {
            self.depth -= 1;
        }
    }

    /// Current location, e.g. `$.items[2].name`.
    pub fn path(&self) -> String {
        self.path_stack
            .iter()
            .fold(String::from("$"), |mut acc, segment| {
                if !segment.starts_with('[') {
                    acc.push('.');
                }
                acc.push_str(segment);
                acc
            })
    }

    /// Get current nesting depth.
    pub fn depth(&self) -> usize {
        self.depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_rendering() {
        let mut cursor = Cursor::new();
        cursor.enter("items").unwrap();
        cursor.enter("[2]").unwrap();
        cursor.enter("name").unwrap();
        assert_eq!(cursor.path(), "$.items[2].name");
        assert_eq!(cursor.depth(), 3);
        cursor.exit();
        cursor.exit();
        assert_eq!(cursor.path(), "$.items");
    }

    #[test]
    fn test_depth_limit() {
        let mut cursor = Cursor::with_limit(2);
        cursor.enter("a").unwrap();
        cursor.enter("b").unwrap();
        let err = cursor.enter("c").unwrap_err();
        assert!(matches!(
            err,
            crate::Error::DepthLimitExceeded { limit: 2, ref path } if path == "$.a.b"
        ));
        assert_eq!(cursor.depth(), 2);
    }

    #[test]
    fn test_exit_at_root_is_noop() {
        let mut cursor = Cursor::new();
        cursor.exit();
        assert_eq!(cursor.depth(), 0);
        assert_eq!(cursor.path(), "$");
    }
}
