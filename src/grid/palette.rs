/// Fill color for a cell with no data for the selected instant.
pub const NO_DATA_COLOR: &str = "#CCCCCC";

/// Foreground used on the light bucket backgrounds (values below 50).
pub const DARK_TEXT: &str = "#1A1A1A";
/// Foreground used on the dark bucket backgrounds (values of 50 and up).
pub const LIGHT_TEXT: &str = "#FFFFFF";
/// Foreground for cells with no data.
pub const MUTED_TEXT: &str = "#666666";

/// Map a value onto the 13-bucket heatmap palette (dark blue through
/// dark red). Buckets are half-open: a value sitting exactly on a
/// boundary belongs to the bucket that starts there.
pub fn color_for(value: Option<f64>) -> &'static str {
    let Some(v) = value else {
        return NO_DATA_COLOR;
    };

    if v < -20.0 {
        return "#00008B";
    }
    if v < -10.0 {
        return "#0000CD";
    }
    if v < 0.0 {
        return "#4169E1";
    }

    if v < 10.0 {
        return "#006400";
    }
    if v < 20.0 {
        return "#32CD32";
    }
    if v < 30.0 {
        return "#FFFF99";
    }
    if v < 40.0 {
        return "#FFFF00";
    }
    if v < 50.0 {
        return "#FFD700";
    }
    if v < 60.0 {
        return "#FFA500";
    }
    if v < 70.0 {
        return "#FF8C00";
    }
    if v < 80.0 {
        return "#FF6347";
    }
    if v < 90.0 {
        return "#FF0000";
    }
    "#8B0000"
}

/// Contrasting text color for a value rendered on its bucket color.
/// The 50 cutoff is independent of the palette boundaries.
pub fn text_color_for(value: Option<f64>) -> &'static str {
    match value {
        None => MUTED_TEXT,
        Some(v) if v < 50.0 => DARK_TEXT,
        Some(_) => LIGHT_TEXT,
    }
}

/// Traffic-light color for the status indicator circles: gray for no
/// data, red for negative, green otherwise.
pub fn status_color_for(value: Option<f64>) -> &'static str {
    match value {
        None => NO_DATA_COLOR,
        Some(v) if v < 0.0 => "#FF0000",
        Some(_) => "#00FF00",
    }
}
