/// Fixed colors cycled over ranked entries and chart series.
pub const PALETTE: [&str; 10] = [
    "#6930c3", "#a2d0c1", "#726a95", "#ec4646", "#51c2d5", "#a98b98", "#a6f0c6", "#eb596e",
    "#23689b", "#f8dc81",
];

/// Leaderboard rows cycle through the full palette.
pub const LEADERBOARD_CYCLE: usize = 10;

/// Chart series only cycle through the first five colors.
pub const SERIES_CYCLE: usize = 5;

/// Color for position `index` when cycling over the first `cycle` palette entries.
pub fn color(index: usize, cycle: usize) -> &'static str {
    PALETTE[index % cycle.clamp(1, PALETTE.len())]
}
