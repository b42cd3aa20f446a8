use std::fmt::Display;

use cbz::CbzEntry;
use cli_table::{format::Justify, Table};

#[allow(clippy::trivially_copy_pass_by_ref)]
fn display_flag(flag: &bool) -> impl Display {
    if *flag {
        "*"
    } else {
        ""
    }
}

#[derive(Debug, Clone, Table)]
pub struct Entry {
    #[table(title = "Name")]
    name: String,
    #[table(title = "Size", justify = "Justify::Right")]
    size: u64,
    #[table(title = "Dir", display_fn = "display_flag")]
    is_dir: bool,
    #[table(title = "Cover", display_fn = "display_flag")]
    is_cover: bool,
}

impl Entry {
    pub fn new(CbzEntry { name, is_dir, size }: CbzEntry, cover_name: Option<&str>) -> Self {
        let is_cover = cover_name == Some(name.as_str());

        Self {
            name,
            size,
            is_dir,
            is_cover,
        }
    }
}
