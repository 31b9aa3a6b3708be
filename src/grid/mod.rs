pub(crate) mod palette;

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// A priced location in the market topology, as served by the node
/// directory. Identity is `id`; `name` is what the category table keys
/// on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub market: String,
    #[serde(default)]
    pub zone: Option<String>,
    pub is_active: bool,
}

/// Display category of a canonical grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Hub,
    LoadZone,
    Reserve,
}

/// One entry of the canonical cell table: display category plus the
/// fixed grid-cell number used by the grid-identifier display mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridCell {
    pub name: &'static str,
    pub category: Category,
    pub cell_number: u32,
}

impl GridCell {
    pub const fn new(name: &'static str, category: Category, cell_number: u32) -> Self {
        Self {
            name,
            category,
            cell_number,
        }
    }
}

/// The 16 canonical cells: 5 hubs, 6 load zones, 5 ancillary-service
/// reserves. Names are matched case-sensitively; every name is unique.
pub static GRID_CELLS: Lazy<HashMap<&'static str, GridCell>> = Lazy::new(|| {
    let cells = vec![
        GridCell::new("HB_HUSTON", Category::Hub, 151),
        GridCell::new("HB_NORTH", Category::Hub, 152),
        GridCell::new("HB_PAN", Category::Hub, 153),
        GridCell::new("HB_SOUTH", Category::Hub, 154),
        GridCell::new("HB_WEST", Category::Hub, 155),
        GridCell::new("LZ_CPS", Category::LoadZone, 156),
        GridCell::new("LZ_HUSTON", Category::LoadZone, 157),
        GridCell::new("LZ_LCRA", Category::LoadZone, 158),
        GridCell::new("LZ_NORTH", Category::LoadZone, 159),
        GridCell::new("LZ_SOUTH", Category::LoadZone, 160),
        GridCell::new("LZ_WEST", Category::LoadZone, 161),
        GridCell::new("Reg-Up", Category::Reserve, 162),
        GridCell::new("Reg-Down", Category::Reserve, 163),
        GridCell::new("RRS", Category::Reserve, 164),
        GridCell::new("ECRS", Category::Reserve, 165),
        GridCell::new("Non-Spin", Category::Reserve, 166),
    ];

    let mut map = HashMap::new();
    for cell in cells {
        map.insert(cell.name, cell);
    }
    map
});

/// Look up the display category of a node name. Names outside the
/// canonical table belong to no category.
pub fn category_of(name: &str) -> Option<Category> {
    GRID_CELLS.get(name).map(|cell| cell.category)
}

/// Fixed grid-cell number (151-166) for a canonical name. Only the
/// grid-identifier display mode reads this; the measured-value path
/// never does.
pub fn grid_cell_number(name: &str) -> Option<u32> {
    GRID_CELLS.get(name).map(|cell| cell.cell_number)
}

/// Nodes partitioned into the three category panels. Nodes whose name
/// is not in the canonical table appear in none of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategorizedNodes {
    pub hubs: Vec<Node>,
    pub load_zones: Vec<Node>,
    pub reserves: Vec<Node>,
}

/// Partition a node list into hubs, load zones and reserves. This is a
/// stable filter: order within each panel follows the input order.
pub fn classify(nodes: &[Node]) -> CategorizedNodes {
    let mut out = CategorizedNodes::default();
    for node in nodes {
        match category_of(&node.name) {
            Some(Category::Hub) => out.hubs.push(node.clone()),
            Some(Category::LoadZone) => out.load_zones.push(node.clone()),
            Some(Category::Reserve) => out.reserves.push(node.clone()),
            None => {}
        }
    }
    out
}
