use serde::{Deserialize, Serialize};

use crate::types::bytes;
use crate::types::error::{DatabaseError, Result};
use crate::types::row::RowData;
use crate::types::{
    CellCount, CellIndex, CellOffset, PageLength, PageNo, RowId, NULL_PAGE_NO, PAGE_HEADER_SIZE,
    SLOT_ENTRY_SIZE,
};

/*
 * Page layout on disk:
 * ┌─────────────────────────────────────────────────────────────────┐
 * │                     PAGE HEADER (9 bytes)                       │
 * │  page_type(1) | cell_count(2) | content_area_offset(2) |        │
 * │  linkage(4)   -- rightmost child (interior) / right sibling     │
 * │                  (leaf), NULL_PAGE_NO = -1                      │
 * ├─────────────────────────────────────────────────────────────────┤
 * │  SLOT ARRAY: u16 cell offsets, tightly packed, growing upward   │
 * ├─────────────────────────────────────────────────────────────────┤
 * │                          FREE SPACE                             │
 * ├─────────────────────────────────────────────────────────────────┤
 * │  CELL CONTENT: cells packed downward from the end of the page   │
 * └─────────────────────────────────────────────────────────────────┘
 */

const CELL_COUNT_OFFSET: usize = 0x01;
const CONTENT_AREA_OFFSET: usize = 0x03;
const LINKAGE_OFFSET: usize = 0x05;

pub const LEAF_CELL_HEADER_LENGTH: usize = 6;
pub const INTERIOR_CELL_LENGTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageType {
    IndexInterior = 0x02,
    TableInterior = 0x05,
    IndexLeaf = 0x0A,
    TableLeaf = 0x0D,
}

impl PageType {
    pub fn from_u8(page_no: PageNo, value: u8) -> Result<Self> {
        match value {
            0x02 => Ok(PageType::IndexInterior),
            0x05 => Ok(PageType::TableInterior),
            0x0A => Ok(PageType::IndexLeaf),
            0x0D => Ok(PageType::TableLeaf),
            _ => Err(DatabaseError::PageCorruption {
                page_no,
                reason: format!("unknown page type {:#04x}", value),
            }),
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// The raw bytes of one page plus the header field accessors shared by
/// both page kinds.
#[derive(Debug, Clone)]
pub struct PageData {
    page_no: PageNo,
    data: Vec<u8>,
    dirty: bool,
}

impl PageData {
    pub fn new(page_no: PageNo, page_type: PageType, page_length: PageLength) -> Self {
        let mut data = vec![0u8; page_length as usize];
        bytes::write_u8(&mut data, 0, page_type.as_u8());
        bytes::write_u16(&mut data, CELL_COUNT_OFFSET, 0);
        bytes::write_u16(&mut data, CONTENT_AREA_OFFSET, page_length);
        bytes::write_i32(&mut data, LINKAGE_OFFSET, NULL_PAGE_NO);
        Self {
            page_no,
            data,
            dirty: false,
        }
    }

    pub fn from_bytes(page_no: PageNo, data: Vec<u8>) -> Self {
        Self {
            page_no,
            data,
            dirty: false,
        }
    }

    pub fn page_no(&self) -> PageNo {
        self.page_no
    }

    pub fn page_length(&self) -> usize {
        self.data.len()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn page_type(&self) -> Result<PageType> {
        PageType::from_u8(self.page_no, bytes::read_u8(&self.data, 0))
    }

    pub fn cell_count(&self) -> CellCount {
        bytes::read_u16(&self.data, CELL_COUNT_OFFSET)
    }

    fn set_cell_count(&mut self, count: CellCount) {
        bytes::write_u16(&mut self.data, CELL_COUNT_OFFSET, count);
        self.dirty = true;
    }

    pub fn content_area_offset(&self) -> CellOffset {
        bytes::read_u16(&self.data, CONTENT_AREA_OFFSET)
    }

    fn set_content_area_offset(&mut self, offset: CellOffset) {
        bytes::write_u16(&mut self.data, CONTENT_AREA_OFFSET, offset);
        self.dirty = true;
    }

    fn linkage(&self) -> PageNo {
        bytes::read_i32(&self.data, LINKAGE_OFFSET)
    }

    fn set_linkage(&mut self, page_no: PageNo) {
        bytes::write_i32(&mut self.data, LINKAGE_OFFSET, page_no);
        self.dirty = true;
    }

    fn slot_position(&self, index: CellIndex) -> Result<usize> {
        if index >= self.cell_count() {
            return Err(self.corrupt(format!("cell index {} out of range", index)));
        }
        let slot = PAGE_HEADER_SIZE + SLOT_ENTRY_SIZE * index as usize;
        if slot + SLOT_ENTRY_SIZE > self.page_length() {
            return Err(self.corrupt(format!("slot {} beyond page boundary", index)));
        }
        Ok(slot)
    }

    pub fn cell_offset(&self, index: CellIndex) -> Result<CellOffset> {
        let slot = self.slot_position(index)?;
        let offset = bytes::read_u16(&self.data, slot);
        if offset as usize >= self.page_length() {
            return Err(self.corrupt(format!("cell offset {} beyond page boundary", offset)));
        }
        Ok(offset)
    }

    fn set_cell_offset(&mut self, index: CellIndex, offset: CellOffset) -> Result<()> {
        let slot = self.slot_position(index)?;
        if offset as usize >= self.page_length() {
            return Err(self.corrupt(format!("cell offset {} beyond page boundary", offset)));
        }
        bytes::write_u16(&mut self.data, slot, offset);
        self.dirty = true;
        Ok(())
    }

    /// Remove one slot by shifting the slots after it down. Cell bytes in
    /// the content area are left behind as garbage; they are never
    /// reclaimed until the table file is rebuilt.
    pub fn delete_slot(&mut self, index: CellIndex) -> Result<()> {
        let count = self.cell_count() as usize;
        if index as usize >= count {
            return Err(self.corrupt(format!("cell index {} out of range", index)));
        }
        if PAGE_HEADER_SIZE + SLOT_ENTRY_SIZE * count > self.page_length() {
            return Err(self.corrupt("slot array beyond page boundary".to_string()));
        }
        for slot in index as usize..count - 1 {
            let next = bytes::read_u16(
                &self.data,
                PAGE_HEADER_SIZE + SLOT_ENTRY_SIZE * (slot + 1),
            );
            bytes::write_u16(&mut self.data, PAGE_HEADER_SIZE + SLOT_ENTRY_SIZE * slot, next);
        }
        self.set_cell_count((count - 1) as CellCount);
        Ok(())
    }

    fn end_of_header(&self) -> usize {
        PAGE_HEADER_SIZE + SLOT_ENTRY_SIZE * self.cell_count() as usize
    }

    /// Strict free-space test: a new cell of `cell_length` bytes plus its
    /// slot must end strictly below the content area.
    fn has_space_for(&self, cell_length: usize) -> bool {
        self.end_of_header() + SLOT_ENTRY_SIZE + cell_length
            < self.content_area_offset() as usize
    }

    /// Reserve content-area space for a new cell and register its slot.
    /// Returns the offset the cell bytes must be written at.
    fn push_cell_slot(&mut self, cell_length: usize) -> Result<CellOffset> {
        let offset = (self.content_area_offset() as usize)
            .checked_sub(cell_length)
            .ok_or_else(|| self.corrupt("cell does not fit into content area".to_string()))?;
        let index = self.cell_count();
        self.set_cell_count(index + 1);
        self.set_content_area_offset(offset as CellOffset);
        self.set_cell_offset(index, offset as CellOffset)?;
        Ok(offset as CellOffset)
    }

    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    fn corrupt(&self, reason: impl Into<String>) -> DatabaseError {
        DatabaseError::PageCorruption {
            page_no: self.page_no,
            reason: reason.into(),
        }
    }
}

/// A cell of a table leaf page: payload length, row id, record payload.
#[derive(Debug, Clone)]
pub struct TableLeafCell {
    pub row_id: RowId,
    pub payload: RowData,
}

impl TableLeafCell {
    pub fn new(row_id: RowId, payload: RowData) -> Self {
        Self { row_id, payload }
    }

    pub fn payload_length(&self) -> usize {
        self.payload.payload_length()
    }

    pub fn length(&self) -> usize {
        LEAF_CELL_HEADER_LENGTH + self.payload_length()
    }

    fn write_to(&self, data: &mut [u8], offset: usize) -> Result<()> {
        let payload_length = self.payload_length();
        bytes::write_u16(data, offset, payload_length as u16);
        bytes::write_i32(data, offset + 2, self.row_id);
        let start = offset + LEAF_CELL_HEADER_LENGTH;
        self.payload.encode_into(&mut data[start..start + payload_length])
    }

    fn read_from(page: &PageData, offset: CellOffset) -> Result<Self> {
        let offset = offset as usize;
        let header_end = offset + LEAF_CELL_HEADER_LENGTH;
        if header_end > page.page_length() {
            return Err(page.corrupt("leaf cell header overflows page boundary"));
        }
        let payload_length = bytes::read_u16(page.bytes(), offset) as usize;
        let row_id = bytes::read_i32(page.bytes(), offset + 2);
        if header_end + payload_length > page.page_length() {
            return Err(page.corrupt("leaf cell payload overflows page boundary"));
        }
        let payload = RowData::decode(&page.bytes()[header_end..header_end + payload_length])?;
        Ok(Self { row_id, payload })
    }
}

/// A cell of a table interior page: left child pointer plus the minimum
/// row id reachable through it.
#[derive(Debug, Clone, Copy)]
pub struct TableInteriorCell {
    pub left_child_page_no: PageNo,
    pub row_id: RowId,
}

impl TableInteriorCell {
    fn write_to(&self, data: &mut [u8], offset: usize) {
        bytes::write_i32(data, offset, self.left_child_page_no);
        bytes::write_i32(data, offset + 4, self.row_id);
    }

    fn read_from(page: &PageData, offset: CellOffset) -> Result<Self> {
        let offset = offset as usize;
        if offset + INTERIOR_CELL_LENGTH > page.page_length() {
            return Err(page.corrupt("interior cell overflows page boundary"));
        }
        Ok(Self {
            left_child_page_no: bytes::read_i32(page.bytes(), offset),
            row_id: bytes::read_i32(page.bytes(), offset + 4),
        })
    }
}

#[derive(Debug, Clone)]
pub struct TableLeafPage {
    pub raw: PageData,
}

impl TableLeafPage {
    pub fn create(page_no: PageNo, page_length: PageLength) -> Self {
        Self {
            raw: PageData::new(page_no, PageType::TableLeaf, page_length),
        }
    }

    pub fn page_no(&self) -> PageNo {
        self.raw.page_no()
    }

    pub fn cell_count(&self) -> CellCount {
        self.raw.cell_count()
    }

    pub fn min_row_id(&self) -> Result<RowId> {
        Ok(self.cell(0)?.row_id)
    }

    pub fn right_sibling_page_no(&self) -> PageNo {
        self.raw.linkage()
    }

    pub fn set_right_sibling_page_no(&mut self, page_no: PageNo) {
        self.raw.set_linkage(page_no);
    }

    pub fn has_right_sibling(&self) -> bool {
        self.right_sibling_page_no() != NULL_PAGE_NO
    }

    pub fn cell(&self, index: CellIndex) -> Result<TableLeafCell> {
        let offset = self.raw.cell_offset(index)?;
        TableLeafCell::read_from(&self.raw, offset)
    }

    pub fn has_enough_space(&self, cell: &TableLeafCell) -> bool {
        self.raw.has_space_for(cell.length())
    }

    pub fn append_cell(&mut self, cell: &TableLeafCell) -> Result<()> {
        let offset = self.raw.push_cell_slot(cell.length())?;
        cell.write_to(&mut self.raw.data, offset as usize)
    }

    /// Overwrite the cell holding `cell.row_id` in place. The replacement
    /// must not be longer than the stored cell.
    pub fn update_cell(&mut self, cell: &TableLeafCell) -> Result<()> {
        for index in 0..self.cell_count() {
            let offset = self.raw.cell_offset(index)?;
            let existing = TableLeafCell::read_from(&self.raw, offset)?;
            if existing.row_id == cell.row_id {
                if cell.length() > existing.length() {
                    return Err(DatabaseError::UpdateGrowsCell { row_id: cell.row_id });
                }
                cell.write_to(&mut self.raw.data, offset as usize)?;
                self.raw.dirty = true;
                return Ok(());
            }
        }
        Err(self
            .raw
            .corrupt(format!("no cell with row id {} in leaf page", cell.row_id)))
    }

    pub fn delete_record(&mut self, index: CellIndex) -> Result<()> {
        self.raw.delete_slot(index)
    }
}

#[derive(Debug, Clone)]
pub struct TableInteriorPage {
    pub raw: PageData,
}

impl TableInteriorPage {
    pub fn create(page_no: PageNo, page_length: PageLength) -> Self {
        Self {
            raw: PageData::new(page_no, PageType::TableInterior, page_length),
        }
    }

    pub fn page_no(&self) -> PageNo {
        self.raw.page_no()
    }

    pub fn cell_count(&self) -> CellCount {
        self.raw.cell_count()
    }

    pub fn min_row_id(&self) -> Result<RowId> {
        Ok(self.cell(0)?.row_id)
    }

    pub fn rightmost_child_page_no(&self) -> PageNo {
        self.raw.linkage()
    }

    pub fn set_rightmost_child_page_no(&mut self, page_no: PageNo) {
        self.raw.set_linkage(page_no);
    }

    pub fn cell(&self, index: CellIndex) -> Result<TableInteriorCell> {
        let offset = self.raw.cell_offset(index)?;
        TableInteriorCell::read_from(&self.raw, offset)
    }

    /// Route a row id to a child: the first cell whose key exceeds it,
    /// otherwise the rightmost child.
    pub fn child_page_no_by_row_id(&self, row_id: RowId) -> Result<PageNo> {
        for index in 0..self.cell_count() {
            let cell = self.cell(index)?;
            if row_id < cell.row_id {
                return Ok(cell.left_child_page_no);
            }
        }
        Ok(self.rightmost_child_page_no())
    }

    pub fn has_enough_space(&self) -> bool {
        self.raw.has_space_for(INTERIOR_CELL_LENGTH)
    }

    pub fn append_cell(&mut self, cell: &TableInteriorCell) -> Result<()> {
        let offset = self.raw.push_cell_slot(INTERIOR_CELL_LENGTH)?;
        cell.write_to(&mut self.raw.data, offset as usize);
        Ok(())
    }

    /// Remove and return the last cell; the cell bytes stay behind in the
    /// content area like any deleted cell.
    pub fn pop_cell(&mut self) -> Result<TableInteriorCell> {
        let count = self.cell_count();
        if count == 0 {
            return Err(self
                .raw
                .corrupt("cannot pop a cell from an empty interior page".to_string()));
        }
        let cell = self.cell(count - 1)?;
        self.raw.delete_slot(count - 1)?;
        Ok(cell)
    }
}

/// A page read back from a table file, dispatched on its type byte.
#[derive(Debug)]
pub enum Page {
    Leaf(TableLeafPage),
    Interior(TableInteriorPage),
}

impl Page {
    pub fn from_data(raw: PageData) -> Result<Page> {
        match raw.page_type()? {
            PageType::TableLeaf => Ok(Page::Leaf(TableLeafPage { raw })),
            PageType::TableInterior => Ok(Page::Interior(TableInteriorPage { raw })),
            other => Err(DatabaseError::PageCorruption {
                page_no: raw.page_no(),
                reason: format!("page type {:?} is not valid for a table file", other),
            }),
        }
    }
}
