use std::io::{Read, Write};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::codes::SCRIPT_VERSION;
use crate::error::{CompileError, CompileResult};
use crate::{CodeValue, FieldValue};

/// Capacity of the instruction code array.
pub const MAX_CODES: usize = 4096;
/// Capacity of the field table.
pub const MAX_FIELDS: usize = 512;
/// User variable budget of one script.
pub const MAX_VARS: usize = 64;

/// Zero-filled trailing padding of the on-disk layout.
pub const EMPTY_DATA_ARRAY_SIZE: usize = 264;
/// Byte size of the code array.
pub const CODES_ARRAY_SIZE: usize = MAX_CODES * 2;
/// Byte size of the field table.
pub const FIELDS_ARRAY_SIZE: usize = MAX_FIELDS * 4;
/// Total on-disk size of a script.
pub const SCRIPT_SIZE: usize = CODES_ARRAY_SIZE + FIELDS_ARRAY_SIZE + EMPTY_DATA_ARRAY_SIZE;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
/// A field-table slot. Cleared tables carry the invalid sentinel.
pub struct ScriptField(FieldValue);

impl ScriptField {
    pub const INVALID: ScriptField = ScriptField(-1);

    pub fn new(value: FieldValue) -> ScriptField {
        ScriptField(value)
    }

    pub fn value(self) -> FieldValue {
        self.0
    }

    pub fn is_invalid(self) -> bool {
        self == ScriptField::INVALID
    }
}

impl Default for ScriptField {
    fn default() -> Self {
        ScriptField::INVALID
    }
}

#[derive(Clone)]
/// The fixed on-disk script: `MAX_CODES` 16-bit codes, `MAX_FIELDS` 32-bit
/// fields, then zero padding. Serialized little-endian with no framing.
pub struct Script {
    codes: [CodeValue; MAX_CODES],
    fields: [ScriptField; MAX_FIELDS],
}

impl Default for Script {
    fn default() -> Self {
        Script::new()
    }
}

impl PartialEq for Script {
    fn eq(&self, other: &Self) -> bool {
        self.codes == other.codes && self.fields == other.fields
    }
}

impl Eq for Script {}

impl std::fmt::Debug for Script {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let used_codes = self.codes.iter().rposition(|&c| c != 0).map_or(0, |i| i + 1);
        let used_fields = self
            .fields
            .iter()
            .rposition(|&x| !x.is_invalid())
            .map_or(0, |i| i + 1);
        f.debug_struct("Script")
            .field("codes", &&self.codes[..used_codes])
            .field("fields", &&self.fields[..used_fields])
            .finish()
    }
}

impl Script {
    /// A cleared script: zero codes, invalid fields.
    pub fn new() -> Script {
        Script {
            codes: [0; MAX_CODES],
            fields: [ScriptField::INVALID; MAX_FIELDS],
        }
    }

    pub fn set_code(&mut self, index: usize, code: CodeValue) -> CompileResult<()> {
        if index >= MAX_CODES {
            return Err(CompileError::BadIndex {
                index,
                min: 0,
                max: MAX_CODES,
            });
        }
        self.codes[index] = code;
        Ok(())
    }

    pub fn code(&self, index: usize) -> CompileResult<CodeValue> {
        if index >= MAX_CODES {
            return Err(CompileError::BadIndex {
                index,
                min: 0,
                max: MAX_CODES,
            });
        }
        Ok(self.codes[index])
    }

    pub fn codes(&self) -> &[CodeValue; MAX_CODES] {
        &self.codes
    }

    pub fn set_field(&mut self, index: usize, field: ScriptField) -> CompileResult<()> {
        if index >= MAX_FIELDS {
            return Err(CompileError::BadIndex {
                index,
                min: 0,
                max: MAX_FIELDS,
            });
        }
        self.fields[index] = field;
        Ok(())
    }

    pub fn field(&self, index: usize) -> CompileResult<ScriptField> {
        if index >= MAX_FIELDS {
            return Err(CompileError::BadIndex {
                index,
                min: 0,
                max: MAX_FIELDS,
            });
        }
        Ok(self.fields[index])
    }

    pub fn fields(&self) -> &[ScriptField; MAX_FIELDS] {
        &self.fields
    }

    /// Writes the version word pair at the first two code positions.
    pub fn set_version(&mut self) {
        self.codes[0] = SCRIPT_VERSION;
        self.codes[1] = 0;
    }

    pub fn version(&self) -> CodeValue {
        self.codes[0]
    }

    /// Zeroes the codes and fills the fields with the invalid sentinel.
    pub fn clear(&mut self) {
        self.clear_codes();
        self.clear_fields();
    }

    pub fn clear_codes(&mut self) {
        self.codes = [0; MAX_CODES];
    }

    pub fn clear_fields(&mut self) {
        self.fields = [ScriptField::INVALID; MAX_FIELDS];
    }

    /// Reads the fixed layout. Truncated input is tolerated: missing
    /// codes stay zero and missing fields keep the invalid sentinel.
    pub fn read(&mut self, reader: &mut impl Read) -> std::io::Result<()> {
        self.clear();
        let mut data = Vec::with_capacity(SCRIPT_SIZE);
        reader.take(SCRIPT_SIZE as u64).read_to_end(&mut data)?;

        let code_bytes = &data[..data.len().min(CODES_ARRAY_SIZE)];
        for (index, pair) in code_bytes.chunks_exact(2).enumerate() {
            self.codes[index] = CodeValue::from_le_bytes([pair[0], pair[1]]);
        }

        if data.len() > CODES_ARRAY_SIZE {
            let field_bytes = &data[CODES_ARRAY_SIZE..];
            let field_bytes = &field_bytes[..field_bytes.len().min(FIELDS_ARRAY_SIZE)];
            for (index, quad) in field_bytes.chunks_exact(4).enumerate() {
                self.fields[index] = ScriptField::new(FieldValue::from_le_bytes([
                    quad[0], quad[1], quad[2], quad[3],
                ]));
            }
        }
        Ok(())
    }

    /// Writes the full fixed layout, padding included.
    pub fn write(&self, writer: &mut impl Write) -> std::io::Result<()> {
        let mut data = Vec::with_capacity(SCRIPT_SIZE);
        for code in self.codes.iter() {
            data.extend_from_slice(&code.to_le_bytes());
        }
        for field in self.fields.iter() {
            data.extend_from_slice(&field.value().to_le_bytes());
        }
        data.resize(SCRIPT_SIZE, 0);
        writer.write_all(&data)
    }
}

/// Source of unique builder identities, so that stale and cross-builder
/// handles can be rejected.
static BUILDER_IDS: AtomicU64 = AtomicU64::new(1);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
/// A stable handle to a node of a [`CodeBuilder`]. Only valid for the
/// builder generation that produced it.
pub struct CodeLocation {
    builder: u64,
    node: usize,
}

#[derive(Debug)]
struct Node {
    code: CodeValue,
    prev: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug)]
/// An ordered, mutable list of code values bounded by `MAX_CODES`,
/// supporting insertion at stable locations. The node links live in an
/// arena so handles stay valid across later insertions.
pub struct CodeBuilder {
    id: u64,
    nodes: Vec<Node>,
    front: Option<usize>,
    back: Option<usize>,
    len: usize,
}

impl Default for CodeBuilder {
    fn default() -> Self {
        CodeBuilder::new()
    }
}

impl CodeBuilder {
    pub fn new() -> CodeBuilder {
        CodeBuilder {
            id: BUILDER_IDS.fetch_add(1, Ordering::Relaxed),
            nodes: Vec::new(),
            front: None,
            back: None,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drops all nodes. Previously handed out locations become invalid.
    pub fn clear(&mut self) {
        self.id = BUILDER_IDS.fetch_add(1, Ordering::Relaxed);
        self.nodes.clear();
        self.front = None;
        self.back = None;
        self.len = 0;
    }

    pub fn front(&self) -> Option<CodeValue> {
        self.front.map(|n| self.nodes[n].code)
    }

    pub fn back(&self) -> Option<CodeValue> {
        self.back.map(|n| self.nodes[n].code)
    }

    pub fn push_back(&mut self, code: CodeValue) -> CompileResult<CodeLocation> {
        self.check_capacity()?;
        let node = self.alloc(code, None, self.back);
        match self.back {
            Some(back) => self.nodes[back].next = Some(node),
            None => self.front = Some(node),
        }
        self.back = Some(node);
        Ok(self.location(node))
    }

    pub fn push_front(&mut self, code: CodeValue) -> CompileResult<CodeLocation> {
        self.check_capacity()?;
        let node = self.alloc(code, self.front, None);
        match self.front {
            Some(front) => self.nodes[front].prev = Some(node),
            None => self.back = Some(node),
        }
        self.front = Some(node);
        Ok(self.location(node))
    }

    pub fn insert_before(
        &mut self,
        location: CodeLocation,
        code: CodeValue,
    ) -> CompileResult<CodeLocation> {
        let base = self.check_location(location)?;
        self.check_capacity()?;
        match self.nodes[base].prev {
            None => self.push_front(code),
            Some(prev) => {
                let node = self.alloc(code, Some(base), Some(prev));
                self.nodes[prev].next = Some(node);
                self.nodes[base].prev = Some(node);
                Ok(self.location(node))
            }
        }
    }

    pub fn insert_after(
        &mut self,
        location: CodeLocation,
        code: CodeValue,
    ) -> CompileResult<CodeLocation> {
        let base = self.check_location(location)?;
        self.check_capacity()?;
        match self.nodes[base].next {
            None => self.push_back(code),
            Some(next) => {
                let node = self.alloc(code, Some(next), Some(base));
                self.nodes[next].prev = Some(node);
                self.nodes[base].next = Some(node);
                Ok(self.location(node))
            }
        }
    }

    /// The code stored at a location.
    pub fn code(&self, location: CodeLocation) -> CompileResult<CodeValue> {
        let node = self.check_location(location)?;
        Ok(self.nodes[node].code)
    }

    /// Overwrites the code stored at a location.
    pub fn set_code(&mut self, location: CodeLocation, code: CodeValue) -> CompileResult<()> {
        let node = self.check_location(location)?;
        self.nodes[node].code = code;
        Ok(())
    }

    /// The codes in list order.
    pub fn iter(&self) -> impl Iterator<Item = CodeValue> + '_ {
        let mut cursor = self.front;
        std::iter::from_fn(move || {
            let node = cursor?;
            cursor = self.nodes[node].next;
            Some(self.nodes[node].code)
        })
    }

    /// Materializes the list into a fresh script's code array. Positions
    /// beyond the list length stay zero.
    pub fn build(&self, script: &mut Script) {
        script.clear_codes();
        for (index, code) in self.iter().take(MAX_CODES).enumerate() {
            script.codes[index] = code;
        }
    }

    fn alloc(&mut self, code: CodeValue, next: Option<usize>, prev: Option<usize>) -> usize {
        self.nodes.push(Node { code, prev, next });
        self.len += 1;
        self.nodes.len() - 1
    }

    fn location(&self, node: usize) -> CodeLocation {
        CodeLocation {
            builder: self.id,
            node,
        }
    }

    fn check_capacity(&self) -> CompileResult<()> {
        if self.len >= MAX_CODES {
            return Err(CompileError::FullCodeData);
        }
        Ok(())
    }

    fn check_location(&self, location: CodeLocation) -> CompileResult<usize> {
        if location.builder != self.id || location.node >= self.nodes.len() {
            return Err(CompileError::InvalidParameter("location"));
        }
        Ok(location.node)
    }
}
