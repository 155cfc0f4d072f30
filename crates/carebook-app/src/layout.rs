// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

/// Source of the current viewport width, injected by the host.
pub trait WidthObserver {
    fn width(&self) -> u16;
}

impl WidthObserver for u16 {
    fn width(&self) -> u16 {
        *self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutMode {
    Compact,
    #[default]
    Wide,
}

impl LayoutMode {
    pub fn observe(observer: &dyn WidthObserver, compact_below: u16) -> Self {
        if observer.width() < compact_below {
            Self::Compact
        } else {
            Self::Wide
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Wide => "wide",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::LayoutMode;

    #[test]
    fn threshold_is_exclusive() {
        assert_eq!(LayoutMode::observe(&79_u16, 80), LayoutMode::Compact);
        assert_eq!(LayoutMode::observe(&80_u16, 80), LayoutMode::Wide);
    }
}
