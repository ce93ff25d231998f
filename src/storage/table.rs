use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

use tracing::debug;

use crate::storage::page::{
    Page, PageData, TableInteriorCell, TableInteriorPage, TableLeafCell, TableLeafPage,
};
use crate::types::error::{DatabaseError, Result};
use crate::types::row::RowData;
use crate::types::value::ColumnDefinition;
use crate::types::{CellIndex, PageCount, PageLength, PageNo, RowId};

/// Visitor verdict for [`Table::map_over_records`]. `Goto(i)` names the
/// next cell index to examine on the current page; a delete visitor
/// returns `Goto(i)` after removing slot `i` so the cell that shifted
/// into that slot is re-visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scan {
    Continue,
    Stop,
    Goto(CellIndex),
}

struct SplitChild {
    page_no: PageNo,
    min_row_id: RowId,
}

/// One table file organized as a B+-tree over row ids. Leaves hold the
/// records and chain to the right; interior pages route by row-id range.
pub struct Table {
    name: String,
    file: File,
    root_page_no: PageNo,
    next_row_id: RowId,
    page_count: PageCount,
    page_length: PageLength,
    columns: Vec<ColumnDefinition>,
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("root_page_no", &self.root_page_no)
            .field("next_row_id", &self.next_row_id)
            .field("page_count", &self.page_count)
            .field("page_length", &self.page_length)
            .field("columns", &self.columns)
            .finish()
    }
}

impl Table {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: String,
        file: File,
        root_page_no: PageNo,
        next_row_id: RowId,
        page_count: PageCount,
        page_length: PageLength,
        columns: Vec<ColumnDefinition>,
    ) -> Self {
        Self {
            name,
            file,
            root_page_no,
            next_row_id,
            page_count,
            page_length,
            columns,
        }
    }

    /// Initialize a fresh table file: page 0 is an empty leaf root.
    pub fn create(
        name: String,
        file: File,
        next_row_id: RowId,
        page_length: PageLength,
        columns: Vec<ColumnDefinition>,
    ) -> Result<Table> {
        let mut table = Table::new(name, file, 0, next_row_id, 1, page_length, columns);
        let root = TableLeafPage::create(0, page_length);
        table.commit_page(&root.raw)?;
        Ok(table)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root_page_no(&self) -> PageNo {
        self.root_page_no
    }

    pub fn next_row_id(&self) -> RowId {
        self.next_row_id
    }

    pub fn page_count(&self) -> PageCount {
        self.page_count
    }

    pub fn page_length(&self) -> PageLength {
        self.page_length
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|col| col.name == name)
    }

    /// Read one page from the file and dispatch on its type byte.
    pub fn get_page(&mut self, page_no: PageNo) -> Result<Page> {
        let mut buffer = vec![0u8; self.page_length as usize];
        self.file
            .seek(SeekFrom::Start(page_no as u64 * self.page_length as u64))?;
        self.file.read_exact(&mut buffer)?;
        Page::from_data(PageData::from_bytes(page_no, buffer))
    }

    /// Write one page back at `page_no * page_length` and flush.
    pub fn commit_page(&mut self, page: &PageData) -> Result<()> {
        self.file
            .seek(SeekFrom::Start(page.page_no() as u64 * self.page_length as u64))?;
        self.file.write_all(page.bytes())?;
        self.file.flush()?;
        Ok(())
    }

    /// Append a record under the current `next_row_id`, splitting pages as
    /// needed. Row ids are assigned monotonically and never reused.
    pub fn append_record(&mut self, payload: RowData) -> Result<()> {
        let cell = TableLeafCell::new(self.next_row_id, payload);
        if let Some(split) = self.append_into(self.root_page_no, &cell)? {
            // The root itself split: grow the tree with a fresh interior root.
            let new_root_no = self.page_count;
            let mut new_root = TableInteriorPage::create(new_root_no, self.page_length);
            new_root.append_cell(&TableInteriorCell {
                left_child_page_no: self.root_page_no,
                row_id: split.min_row_id,
            })?;
            new_root.set_rightmost_child_page_no(split.page_no);
            self.commit_page(&new_root.raw)?;
            debug!(
                table = %self.name,
                old_root = self.root_page_no,
                new_root = new_root_no,
                "root split"
            );
            self.root_page_no = new_root_no;
            self.page_count += 1;
        }
        self.next_row_id += 1;
        Ok(())
    }

    fn append_into(&mut self, page_no: PageNo, cell: &TableLeafCell) -> Result<Option<SplitChild>> {
        match self.get_page(page_no)? {
            Page::Leaf(mut leaf) => self.append_to_leaf(&mut leaf, cell),
            Page::Interior(mut interior) => self.append_under_interior(&mut interior, cell),
        }
    }

    fn append_to_leaf(
        &mut self,
        leaf: &mut TableLeafPage,
        cell: &TableLeafCell,
    ) -> Result<Option<SplitChild>> {
        let count = leaf.cell_count();
        if count > 0 && leaf.cell(count - 1)?.row_id >= cell.row_id {
            return Err(DatabaseError::PageCorruption {
                page_no: leaf.page_no(),
                reason: format!("appended row id {} does not increase", cell.row_id),
            });
        }

        if leaf.has_enough_space(cell) {
            leaf.append_cell(cell)?;
            self.commit_page(&leaf.raw)?;
            return Ok(None);
        }

        let split_page_no = self.page_count;
        let mut split = TableLeafPage::create(split_page_no, self.page_length);
        leaf.set_right_sibling_page_no(split_page_no);
        if !split.has_enough_space(cell) {
            return Err(DatabaseError::PayloadTooLarge {
                length: cell.payload_length(),
            });
        }
        split.append_cell(cell)?;
        self.commit_page(&split.raw)?;
        self.commit_page(&leaf.raw)?;
        self.page_count += 1;
        debug!(
            table = %self.name,
            full_leaf = leaf.page_no(),
            new_leaf = split_page_no,
            "leaf split"
        );
        Ok(Some(SplitChild {
            page_no: split_page_no,
            min_row_id: cell.row_id,
        }))
    }

    fn append_under_interior(
        &mut self,
        page: &mut TableInteriorPage,
        cell: &TableLeafCell,
    ) -> Result<Option<SplitChild>> {
        let child_page_no = page.child_page_no_by_row_id(cell.row_id)?;
        let Some(child_split) = self.append_into(child_page_no, cell)? else {
            return Ok(None);
        };

        // The child gained a new right sibling: the separator routes the
        // old rightmost subtree, and the new child becomes rightmost.
        let separator = TableInteriorCell {
            left_child_page_no: page.rightmost_child_page_no(),
            row_id: child_split.min_row_id,
        };
        if page.has_enough_space() {
            page.append_cell(&separator)?;
            page.set_rightmost_child_page_no(child_split.page_no);
            self.commit_page(&page.raw)?;
            return Ok(None);
        }

        let split_page_no = self.page_count;
        let mut split = TableInteriorPage::create(split_page_no, self.page_length);
        split.append_cell(&separator)?;
        split.set_rightmost_child_page_no(child_split.page_no);
        // Promote the old page's last separator: its child becomes the old
        // page's rightmost subtree and its key the boundary handed to the
        // parent, so both pages keep routing every key range.
        let promoted = page.pop_cell()?;
        page.set_rightmost_child_page_no(promoted.left_child_page_no);
        self.commit_page(&split.raw)?;
        self.commit_page(&page.raw)?;
        self.page_count += 1;
        debug!(
            table = %self.name,
            full_interior = page.page_no(),
            new_interior = split_page_no,
            boundary = promoted.row_id,
            "interior split"
        );
        Ok(Some(SplitChild {
            page_no: split_page_no,
            min_row_id: promoted.row_id,
        }))
    }

    /// Overwrite the stored record with `cell.row_id` in place.
    pub fn update_record(&mut self, cell: &TableLeafCell) -> Result<()> {
        let mut leaf = self.leaf_page_by_row_id(cell.row_id)?;
        leaf.update_cell(cell)?;
        self.commit_page(&leaf.raw)
    }

    fn leftmost_leaf(&mut self) -> Result<TableLeafPage> {
        let mut page = self.get_page(self.root_page_no)?;
        loop {
            match page {
                Page::Leaf(leaf) => return Ok(leaf),
                Page::Interior(interior) => {
                    page = self.get_page(interior.cell(0)?.left_child_page_no)?;
                }
            }
        }
    }

    fn leaf_page_by_row_id(&mut self, row_id: RowId) -> Result<TableLeafPage> {
        let mut page = self.get_page(self.root_page_no)?;
        loop {
            match page {
                Page::Leaf(leaf) => return Ok(leaf),
                Page::Interior(interior) => {
                    page = self.get_page(interior.child_page_no_by_row_id(row_id)?)?;
                }
            }
        }
    }

    /// Walk every record in row-id order, driving the visitor protocol.
    /// Pages dirtied by the visitor are committed before the scan moves
    /// on. Returns `false` when the visitor stopped the scan early.
    pub fn map_over_records<F>(&mut self, mut mapper: F) -> Result<bool>
    where
        F: FnMut(CellIndex, &mut TableLeafPage, TableLeafCell) -> Result<Scan>,
    {
        let mut leaf = self.leftmost_leaf()?;
        loop {
            let mut index: CellIndex = 0;
            while index < leaf.cell_count() {
                let cell = leaf.cell(index)?;
                let verdict = mapper(index, &mut leaf, cell)?;
                if leaf.raw.take_dirty() {
                    self.commit_page(&leaf.raw)?;
                }
                match verdict {
                    Scan::Continue => index += 1,
                    Scan::Stop => return Ok(false),
                    Scan::Goto(next) => index = next,
                }
            }
            if !leaf.has_right_sibling() {
                return Ok(true);
            }
            let sibling_no = leaf.right_sibling_page_no();
            leaf = match self.get_page(sibling_no)? {
                Page::Leaf(next) => next,
                Page::Interior(_) => {
                    return Err(DatabaseError::PageCorruption {
                        page_no: sibling_no,
                        reason: "right sibling of a leaf is not a leaf page".to_string(),
                    })
                }
            };
        }
    }
}
