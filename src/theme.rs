use ratatui::style::Color;

// Color palette structure
#[derive(Clone, Debug)]
pub struct Base16Palette {
    pub base_00: Color, // Background
    pub base_01: Color, // Lighter background
    pub base_02: Color, // Selection background
    pub base_03: Color, // Comments, invisibles
    pub base_04: Color, // Dark foreground
    pub base_05: Color, // Default foreground
    pub base_06: Color, // Light foreground
    pub base_07: Color, // Light background
    pub base_08: Color, // Red
    pub base_09: Color, // Orange
    pub base_0a: Color, // Yellow
    pub base_0b: Color, // Green
    pub base_0c: Color, // Cyan
    pub base_0d: Color, // Blue
    pub base_0e: Color, // Purple
}

const fn hex(rgb: u32) -> Color {
    Color::Rgb((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
}

// Oceanic Next
pub const OCEANIC_NEXT: Base16Palette = Base16Palette {
    base_00: hex(0x1B2B34),
    base_01: hex(0x343D46),
    base_02: hex(0x4F5B66),
    base_03: hex(0x65737E),
    base_04: hex(0xA7ADBA),
    base_05: hex(0xC0C5CE),
    base_06: hex(0xCDD3DE),
    base_07: hex(0xF0F4F8),
    base_08: hex(0xEC5F67),
    base_09: hex(0xF99157),
    base_0a: hex(0xFAC863),
    base_0b: hex(0x99C794),
    base_0c: hex(0x5FB3B3),
    base_0d: hex(0x6699CC),
    base_0e: hex(0xC594C5),
};
