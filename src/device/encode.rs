use crate::device::types::PatternCode;
use crate::error::WandError;

/// Parses a 24-bit hex color such as `#2185d0` or `0x2185D0`.
pub fn parse_color(color: &str) -> Result<u32, WandError> {
    let trimmed = color.trim();
    let digits = trimmed.strip_prefix('#')
        .or_else(|| trimmed.strip_prefix("0x"))
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    match u32::from_str_radix(digits, 16) {
        Ok(value) if value <= 0xFF_FF_FF => Ok(value),
        Ok(_) => Err(WandError::configuration(format!("Color {} does not fit in 24 bits", color))),
        Err(err) => Err(WandError::configuration(format!("Invalid color {}: {}", color, err))),
    }
}

pub fn rgb565(color: u32) -> u16 {
    let r = ((color >> 16) & 0xFF) as u16;
    let g = ((color >> 8) & 0xFF) as u16;
    let b = (color & 0xFF) as u16;

    ((r & 0xF8) << 8) | ((g & 0xFC) << 3) | ((b & 0xF8) >> 3)
}

/// `[on, rgb565 high byte, rgb565 low byte]`
pub fn led_payload(color: &str, on: bool) -> Result<[u8; 3], WandError> {
    let [high, low] = rgb565(parse_color(color)?).to_be_bytes();
    Ok([on as u8, high, low])
}

pub fn vibrate_payload(pattern: PatternCode) -> [u8; 1] {
    [pattern.into()]
}
