use crate::path::parent_path;

/// Current directory plus the stacks used by back/forward.
///
/// `go_back` is hierarchical: it moves to the parent and remembers the child on
/// the forward stack. Every fresh-branch move clears the forward stack so a
/// stale child can never be reached after the user went somewhere new.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NavigationHistory {
    current: String,
    back_stack: Vec<String>,
    forward_stack: Vec<String>,
}

impl NavigationHistory {
    pub fn new(start: impl Into<String>) -> Self {
        Self {
            current: start.into(),
            back_stack: Vec::new(),
            forward_stack: Vec::new(),
        }
    }

    pub fn current(&self) -> &str {
        &self.current
    }

    pub fn back_stack(&self) -> &[String] {
        &self.back_stack
    }

    pub fn forward_stack(&self) -> &[String] {
        &self.forward_stack
    }

    pub fn navigate_to(&mut self, path: impl Into<String>, is_fresh_branch: bool) {
        let path = path.into();
        if is_fresh_branch {
            self.forward_stack.clear();
            if path != self.current {
                self.back_stack.push(self.current.clone());
            }
        }
        self.current = path;
    }

    pub fn go_back(&mut self) -> bool {
        let parent = parent_path(&self.current);
        if parent == self.current {
            return false;
        }
        let previous = std::mem::replace(&mut self.current, parent);
        self.forward_stack.push(previous);
        true
    }

    pub fn go_forward(&mut self) -> bool {
        match self.forward_stack.pop() {
            Some(next) => {
                self.navigate_to(next, false);
                true
            }
            None => false,
        }
    }
}
