/// Model input size (width, height) used by YOLO exports unless overridden.
pub const DEFAULT_INPUT_SIZE: (u32, u32) = (640, 640);

/// Padding value for the letterbox border.
pub const LETTERBOX_COLOR: u8 = 114;
