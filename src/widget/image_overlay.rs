use image::DynamicImage;
use log::{debug, warn};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};
use ratatui_image::{Image, Resize, picker::Picker, protocol::Protocol};

use crate::annotations::AnnotationId;
use crate::illustration::{ImageError, ImageRef};
use crate::theme::OCEANIC_NEXT;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageOverlayAction {
    Close,
    Save,
    OpenExternal,
}

/// Enlarged view of one annotation's illustration.
///
/// The image is decoded once; the terminal protocol is rebuilt only when the
/// available area changes.
pub struct ImageOverlay {
    annotation: AnnotationId,
    image: ImageRef,
    decoded: Result<DynamicImage, String>,
    protocol: Option<(Rect, Protocol)>,
}

impl ImageOverlay {
    pub fn new(annotation: AnnotationId, image: ImageRef) -> Self {
        let decoded = image.decode().map_err(|e: ImageError| e.to_string());
        Self {
            annotation,
            image,
            decoded,
            protocol: None,
        }
    }

    pub fn annotation(&self) -> AnnotationId {
        self.annotation
    }

    pub fn image(&self) -> &ImageRef {
        &self.image
    }

    /// File name used when saving
    pub fn file_name(&self) -> String {
        format!("illustration-{}.png", self.annotation)
    }

    pub fn render(&mut self, f: &mut Frame, area: Rect, picker: &Picker) {
        let popup = centered(area, 90, 90);
        f.render_widget(Clear, popup);

        let block = Block::default()
            .title(" Illustration - [s] save  [O] open  [Esc] close ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(OCEANIC_NEXT.base_0c))
            .style(Style::default().bg(OCEANIC_NEXT.base_00));
        let inner = block.inner(popup);
        f.render_widget(block, popup);

        let image = match &self.decoded {
            Ok(image) => image,
            Err(message) => {
                render_problem(f, inner, format!("Cannot display image: {message}"));
                return;
            }
        };

        if self.protocol.as_ref().is_none_or(|(rect, _)| *rect != inner) {
            match picker.new_protocol(image.clone(), inner, Resize::Fit(None)) {
                Ok(protocol) => {
                    debug!(
                        "Built {:?} image protocol for {}",
                        picker.protocol_type(),
                        self.annotation
                    );
                    self.protocol = Some((inner, protocol));
                }
                Err(e) => {
                    warn!("Cannot build image protocol: {e}");
                    self.protocol = None;
                    render_problem(f, inner, format!("Cannot display image: {e}"));
                    return;
                }
            }
        }

        if let Some((_, protocol)) = &self.protocol {
            let fitted = protocol.area();
            let target = Rect::new(
                inner.x + inner.width.saturating_sub(fitted.width) / 2,
                inner.y + inner.height.saturating_sub(fitted.height) / 2,
                fitted.width.min(inner.width),
                fitted.height.min(inner.height),
            );
            f.render_widget(Image::new(protocol), target);
        }
    }
}

fn render_problem(f: &mut Frame, area: Rect, message: String) {
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(
            message,
            Style::default().fg(OCEANIC_NEXT.base_08),
        ))),
        area,
    );
}

fn centered(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(rows[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::tiny_png;
    use ratatui::{Terminal, backend::TestBackend};

    #[test]
    fn halfblock_picker_fits_the_image_inside_the_popup() {
        let mut overlay =
            ImageOverlay::new(AnnotationId::new(7), ImageRef::from_png_bytes(&tiny_png(8, 8)));
        let picker = Picker::halfblocks();
        let mut terminal = Terminal::new(TestBackend::new(40, 20)).unwrap();

        terminal
            .draw(|f| {
                let screen = f.area();
                overlay.render(f, screen, &picker);
            })
            .unwrap();

        let (inner, protocol) = overlay.protocol.as_ref().unwrap();
        let fitted = protocol.area();
        assert!(fitted.width > 0 && fitted.height > 0);
        assert!(fitted.width <= inner.width && fitted.height <= inner.height);

        let buffer = terminal.backend().buffer();
        let title: String = (0..buffer.area.width)
            .map(|x| buffer[(x, inner.y - 1)].symbol().to_string())
            .collect();
        assert!(title.contains("Illustration"));
    }

    #[test]
    fn wide_screens_keep_the_popup_inside() {
        let area = Rect::new(0, 0, 1000, 300);
        let popup = centered(area, 90, 90);
        assert!(popup.width >= 899 && popup.width <= 901);
        assert!(popup.right() <= area.right());
        assert!(popup.bottom() <= area.bottom());
    }

    #[test]
    fn undecodable_image_is_reported() {
        let overlay =
            ImageOverlay::new(AnnotationId::new(7), ImageRef::from_base64_png("bm90LWEtcG5n"));
        assert!(overlay.decoded.is_err());
        assert_eq!(overlay.file_name(), "illustration-7.png");
    }
}
