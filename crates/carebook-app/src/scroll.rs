// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

/// Which of the two horizontally scrolling surfaces moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollSource {
    Table,
    Proxy,
}

/// Two-way binding between the data table's horizontal offset and a
/// decorative proxy scrollbar above it. Units are whatever the host measures
/// in (terminal cells, pixels, columns) as long as they are consistent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollSync {
    content_width: u16,
    viewport_width: u16,
    table_offset: u16,
    proxy_offset: u16,
    measured_for: Option<(usize, usize)>,
}

impl ScrollSync {
    /// Width changes whenever the visible rows or day columns change.
    pub fn needs_remeasure(&self, rows: usize, day_columns: usize) -> bool {
        self.measured_for != Some((rows, day_columns))
    }

    pub fn measure(
        &mut self,
        content_width: u16,
        viewport_width: u16,
        rows: usize,
        day_columns: usize,
    ) {
        self.content_width = content_width;
        self.viewport_width = viewport_width;
        self.measured_for = Some((rows, day_columns));
        let clamped = self.table_offset.min(self.max_offset());
        self.table_offset = clamped;
        self.proxy_offset = clamped;
    }

    /// Scrollable width the proxy must mirror.
    pub const fn proxy_content_width(&self) -> u16 {
        self.content_width
    }

    pub const fn viewport_width(&self) -> u16 {
        self.viewport_width
    }

    pub const fn max_offset(&self) -> u16 {
        self.content_width.saturating_sub(self.viewport_width)
    }

    pub const fn table_offset(&self) -> u16 {
        self.table_offset
    }

    pub const fn proxy_offset(&self) -> u16 {
        self.proxy_offset
    }

    /// Records a scroll on `source` and mirrors it to the other surface.
    /// Returns the offset to apply to the other surface, or `None` when it
    /// is already there, which keeps mirrored scroll events from echoing.
    pub fn on_scroll(&mut self, source: ScrollSource, offset: u16) -> Option<u16> {
        let offset = offset.min(self.max_offset());
        let (moved, mirror) = match source {
            ScrollSource::Table => (&mut self.table_offset, &mut self.proxy_offset),
            ScrollSource::Proxy => (&mut self.proxy_offset, &mut self.table_offset),
        };
        *moved = offset;
        if *mirror == offset {
            return None;
        }
        *mirror = offset;
        Some(offset)
    }

    pub fn scroll_by(&mut self, source: ScrollSource, delta: i32) -> Option<u16> {
        let current = match source {
            ScrollSource::Table => self.table_offset,
            ScrollSource::Proxy => self.proxy_offset,
        };
        let next = (i32::from(current) + delta).clamp(0, i32::from(u16::MAX));
        self.on_scroll(source, u16::try_from(next).unwrap_or(u16::MAX))
    }

    /// Scrolls the minimum amount that brings `[start, start + width)` into view.
    pub fn reveal(&mut self, start: u16, width: u16) -> Option<u16> {
        let end = start.saturating_add(width);
        let view_end = self.table_offset.saturating_add(self.viewport_width);
        if start < self.table_offset {
            self.on_scroll(ScrollSource::Table, start)
        } else if end > view_end {
            self.on_scroll(
                ScrollSource::Table,
                end.saturating_sub(self.viewport_width),
            )
        } else {
            None
        }
    }
}
