//! Selection depth measurement.

use std::collections::HashMap;

use hashbrown::HashSet;

use crate::error::{GeneratorError, Result};
use crate::selection::{FieldNode, ResolveInfo, Selection};

/// Depth of the root field's selection: the root field is level 1 and every
/// nested field one level deeper. Fragments are transparent.
pub fn query_depth(info: &ResolveInfo) -> Result<usize> {
    let mut walker = DepthWalker {
        fragments: &info.fragments,
        active: HashSet::new(),
    };
    walker.field(&info.field, 1)
}

struct DepthWalker<'a> {
    fragments: &'a HashMap<String, Vec<Selection>>,
    active: HashSet<&'a str>,
}

impl<'a> DepthWalker<'a> {
    fn field(&mut self, field: &'a FieldNode, level: usize) -> Result<usize> {
        self.selections(&field.selections, level + 1)
            .map(|nested| nested.max(level))
    }

    /// Deepest level reached by `selections`, which sit at `level`; 0 when
    /// there are none.
    fn selections(&mut self, selections: &'a [Selection], level: usize) -> Result<usize> {
        let mut deepest = 0;
        for selection in selections {
            let depth = match selection {
                Selection::Field(field) => self.field(field, level)?,
                Selection::InlineFragment(inner) => self.selections(inner, level)?,
                Selection::FragmentSpread(name) => {
                    let fragments = self.fragments;
                    let (name, inner) = fragments
                        .get_key_value(name.as_str())
                        .ok_or_else(|| GeneratorError::UnknownFragment(name.clone()))?;
                    if !self.active.insert(name.as_str()) {
                        return Err(GeneratorError::FragmentCycle(name.clone()));
                    }
                    let depth = self.selections(inner, level)?;
                    self.active.remove(name.as_str());
                    depth
                }
            };
            deepest = deepest.max(depth);
        }
        Ok(deepest)
    }
}
