/// Line and file counts for one side of the index (staged or unstaged)
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeCounts {
    pub added: u64,
    pub deleted: u64,
    pub files: u64,
}

#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct GitStatus {
    /// Empty when not in a repository or HEAD is detached
    pub branch: String,
    pub has_changes: bool,
    pub staged: ChangeCounts,
    pub unstaged: ChangeCounts,
}

impl GitStatus {
    pub fn total_added(&self) -> u64 {
        self.staged.added + self.unstaged.added
    }

    pub fn total_deleted(&self) -> u64 {
        self.staged.deleted + self.unstaged.deleted
    }
}
