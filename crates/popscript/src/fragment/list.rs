use super::{CodeFragment, FragmentKind};

#[derive(Clone, Debug, Default, PartialEq)]
/// An ordered fragment sequence tagged with the source line it originated
/// from. Downstream diagnostics rely on the line surviving every list
/// transformation.
pub struct FragmentList {
    code: Vec<CodeFragment>,
    source_line: usize,
}

impl FragmentList {
    pub fn new(source_line: usize) -> FragmentList {
        FragmentList {
            code: Vec::new(),
            source_line,
        }
    }

    pub fn from_vec(source_line: usize, code: Vec<CodeFragment>) -> FragmentList {
        FragmentList { code, source_line }
    }

    pub fn single(source_line: usize, fragment: CodeFragment) -> FragmentList {
        FragmentList {
            code: vec![fragment],
            source_line,
        }
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn source_line(&self) -> usize {
        self.source_line
    }

    pub fn get(&self, index: usize) -> &CodeFragment {
        &self.code[index]
    }

    pub fn fragments(&self) -> &[CodeFragment] {
        &self.code
    }

    pub fn push(&mut self, fragment: CodeFragment) {
        self.code.push(fragment);
    }

    /// The sub-list `[offset, offset + len)`, keeping the source line.
    pub fn sublist(&self, offset: usize, len: usize) -> FragmentList {
        FragmentList {
            code: self.code[offset..offset + len].to_vec(),
            source_line: self.source_line,
        }
    }

    /// The sub-list from `offset` to the end.
    pub fn sublist_from(&self, offset: usize) -> FragmentList {
        self.sublist(offset, self.code.len() - offset)
    }

    /// Concatenates on the right. The result carries the smaller of the
    /// two source lines.
    pub fn concat(&self, other: &FragmentList) -> FragmentList {
        let mut code = Vec::with_capacity(self.code.len() + other.code.len());
        code.extend_from_slice(&self.code);
        code.extend_from_slice(&other.code);
        FragmentList {
            code,
            source_line: self.source_line.min(other.source_line),
        }
    }

    /// Concatenates on the left.
    pub fn concat_front(&self, other: &FragmentList) -> FragmentList {
        other.concat(self)
    }

    /// Inserts a whole list at `index`.
    pub fn concat_middle(&self, index: usize, other: &FragmentList) -> FragmentList {
        if index == 0 {
            return self.concat_front(other);
        }
        if index == self.code.len() {
            return self.concat(other);
        }
        self.sublist(0, index)
            .concat(other)
            .concat(&self.sublist_from(index))
    }

    /// The content strictly between the first occurrence of `from` and the
    /// following occurrence of `to`. Empty when `from` is absent.
    pub fn extract(&self, from: &CodeFragment, to: &CodeFragment) -> FragmentList {
        let Some(start) = self.index_of(from) else {
            return FragmentList::new(self.source_line);
        };
        let mut len = 0;
        for fragment in &self.code[start + 1..] {
            if fragment == to {
                break;
            }
            len += 1;
        }
        self.sublist(start + 1, len)
    }

    pub fn count(&self, fragment: &CodeFragment) -> usize {
        self.code.iter().filter(|c| *c == fragment).count()
    }

    pub fn count_kind(&self, kind: FragmentKind) -> usize {
        self.code.iter().filter(|c| c.is(kind)).count()
    }

    pub fn has(&self, fragment: &CodeFragment) -> bool {
        self.code.iter().any(|c| c == fragment)
    }

    pub fn has_kind(&self, kind: FragmentKind) -> bool {
        self.code.iter().any(|c| c.is(kind))
    }

    pub fn index_of(&self, fragment: &CodeFragment) -> Option<usize> {
        self.code.iter().position(|c| c == fragment)
    }

    pub fn index_of_kind(&self, kind: FragmentKind) -> Option<usize> {
        self.code.iter().position(|c| c.is(kind))
    }

    pub fn last_index_of(&self, fragment: &CodeFragment) -> Option<usize> {
        self.code.iter().rposition(|c| c == fragment)
    }

    pub fn last_index_of_kind(&self, kind: FragmentKind) -> Option<usize> {
        self.code.iter().rposition(|c| c.is(kind))
    }

    /// Splits by a separator fragment. `limit` bounds how many separators
    /// take effect; `None` is unbounded. An empty trailing part is
    /// dropped.
    pub fn split(&self, separator: &CodeFragment, limit: Option<usize>) -> Vec<FragmentList> {
        if self.code.is_empty() || limit == Some(1) {
            return vec![self.clone()];
        }
        let mut remaining = limit.map(|l| l.saturating_sub(1));
        let mut parts = Vec::new();
        let mut off = 0;
        let mut i = 0;
        while i < self.code.len() {
            let splits_left = remaining.map_or(true, |r| r > 0);
            if &self.code[i] == separator && splits_left {
                parts.push(self.sublist(off, i - off));
                off = i + 1;
                if let Some(r) = remaining.as_mut() {
                    *r -= 1;
                }
            }
            i += 1;
        }
        if i > off {
            parts.push(self.sublist(off, i - off));
        }
        parts
    }

    /// A pointer view positioned at the start.
    pub fn ptr(&self) -> Pointer<'_> {
        self.ptr_at(0)
    }

    /// A pointer view positioned at `index`.
    pub fn ptr_at(&self, index: usize) -> Pointer<'_> {
        Pointer {
            list: self,
            index,
            limit: self.code.len(),
        }
    }
}

impl std::fmt::Display for FragmentList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[")?;
        for (idx, fragment) in self.code.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            fragment.fmt(f)?;
        }
        f.write_str("]")
    }
}

#[derive(Copy, Clone, Debug)]
/// A cursor-like view over a fragment list: advance, retreat, peek and
/// snap-to-end.
pub struct Pointer<'a> {
    list: &'a FragmentList,
    index: usize,
    limit: usize,
}

impl<'a> Pointer<'a> {
    pub fn list(&self) -> &'a FragmentList {
        self.list
    }

    /// The source line of the underlying list.
    pub fn line(&self) -> usize {
        self.list.source_line()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Whether the pointer still addresses a fragment.
    pub fn is_valid(&self) -> bool {
        self.index < self.limit
    }

    /// The fragment under the pointer.
    pub fn current(&self) -> Option<&'a CodeFragment> {
        if self.is_valid() {
            Some(self.list.get(self.index))
        } else {
            None
        }
    }

    /// Advances past the current fragment.
    pub fn advance(&mut self) {
        self.index += 1;
    }

    /// Steps back one fragment.
    pub fn retreat(&mut self) {
        self.index -= 1;
    }

    /// Snaps the index to the end of the list.
    pub fn finish(&mut self) {
        self.index = self.limit;
    }
}
