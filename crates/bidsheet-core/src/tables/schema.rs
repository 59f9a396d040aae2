use crate::model::TableKind;

/// Key of the record identifier column; gates table validity and
/// decides whether a row opens a new record.
pub const SERIAL: &str = "serial";

/// Free-text column that receives continuation rows.
pub const REMARKS: &str = "remarks";

/// A semantic column and the header texts it is printed under.
#[derive(Debug, Clone, Copy)]
pub struct ColumnDef {
    pub key: &'static str,
    pub variants: &'static [&'static str],
}

const fn col(key: &'static str, variants: &'static [&'static str]) -> ColumnDef {
    ColumnDef { key, variants }
}

// Order is match priority: a header token claimed by an earlier key is not
// offered to later ones, so "小段" is listed before "段".
static LAND_COLUMNS: &[ColumnDef] = &[
    col(SERIAL, &["編號"]),
    col("district", &["鄉鎮市區", "鄉鎮"]),
    col("subsection", &["小段"]),
    col("section", &["段"]),
    col("parcel", &["地號"]),
    col("area", &["面積"]),
    col("rights", &["權利範圍", "持分"]),
    col("price", &["價格", "價額", "底價"]),
    col(REMARKS, &["備註", "備考"]),
];

static BUILDING_COLUMNS: &[ColumnDef] = &[
    col(SERIAL, &["編號"]),
    col("building_number", &["建號"]),
    col("location", &["基地坐落", "坐落"]),
    col("address", &["門牌"]),
    col("structure", &["建材", "層數", "構造"]),
    col("area", &["面積"]),
    col("rights", &["權利範圍", "持分"]),
    col("price", &["價格", "價額", "底價"]),
    col(REMARKS, &["備註", "備考"]),
];

pub fn columns(kind: TableKind) -> &'static [ColumnDef] {
    match kind {
        TableKind::Land => LAND_COLUMNS,
        TableKind::Building => BUILDING_COLUMNS,
    }
}

pub fn keys(kind: TableKind) -> impl Iterator<Item = &'static str> {
    columns(kind).iter().map(|c| c.key)
}

impl ColumnDef {
    pub fn matches(&self, header_text: &str) -> bool {
        self.variants.iter().any(|v| header_text.contains(v))
    }
}
