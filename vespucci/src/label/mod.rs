//! Deferred label rendering with conflict resolution.
//!
//! Labels are not drawn when their features are: they are collected into a
//! [`LabelCache`] during the render pass and drawn in one batch at the end, so that
//! higher priority labels win the fight for screen space regardless of layer order.

mod placement;
mod style;

pub use placement::PlacementTransform;
pub use style::{Halo, LabelPlacement, LabelPlacementMode, TextStyle, TextSymbolizer};

use std::collections::hash_map::Entry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ahash::HashMap;

use crate::color::Color;
use crate::error::VespucciError;
use crate::geometry::{EdgeRule, Geom, Rect};
use crate::view::Size;

use placement::{goodness_of_fit, place};

/// Priority of labels whose symbolizer does not assign one.
pub const DEFAULT_PRIORITY: f64 = 1000.0;

/// Minimum goodness of fit a polygon label must reach to be drawn.
pub const MIN_GOODNESS_FIT: f64 = 0.7;

/// Measured extents of shaped label text, in pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ShapedGlyph {
    /// Advance width of the whole text run.
    pub width: f64,
    /// Line height of the text run.
    pub height: f64,
}

/// Backend that shapes and draws label text.
pub trait LabelSurface {
    /// Measures the text without drawing it.
    fn shape(&mut self, text: &str, style: &TextStyle) -> Result<ShapedGlyph, VespucciError>;

    /// Draws the text with the given screen transform.
    fn draw_glyph(
        &mut self,
        text: &str,
        style: &TextStyle,
        transform: &PlacementTransform,
    ) -> Result<(), VespucciError>;
}

/// Cancels a label batch from another thread.
#[derive(Clone)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    /// Requests the running [`LabelCache::end`] call to return early.
    ///
    /// The flag is checked between labels, so the label being drawn still completes.
    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }
}

struct LabelItem {
    text: String,
    style: TextStyle,
    placement: LabelPlacement,
    geometry: Vec<Geom>,
    priority: f64,
    space_around: i32,
    scale_range: Option<(f64, f64)>,
    sequence: u64,
}

/// A drawn label and the screen space it reserves.
///
/// `bounds` is `None` for labels that opted out of conflict resolution with a
/// negative space-around margin; those reserve nothing.
struct PlacedGlyph {
    bounds: Option<Rect>,
}

/// Collects labels during a render pass and draws them afterwards.
///
/// Labels are drawn in descending priority order. A label is dropped when its
/// geometry yields no usable position, when it does not fit its polygon well enough,
/// or when its padded bounds overlap an already drawn label. Grouped labels (vendor
/// option `"group"`) with identical text are merged into one label whose priority is
/// the sum of the members'.
pub struct LabelCache {
    grouped: HashMap<String, LabelItem>,
    ungrouped: Vec<LabelItem>,
    next_sequence: u64,
    scale_denominator: f64,
    stop: Arc<AtomicBool>,
}

impl Default for LabelCache {
    fn default() -> Self {
        Self::new()
    }
}

impl LabelCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self {
            grouped: HashMap::default(),
            ungrouped: Vec::new(),
            next_sequence: 0,
            scale_denominator: 0.0,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Begins a new label batch, discarding anything collected before.
    pub fn start(&mut self) {
        self.grouped.clear();
        self.ungrouped.clear();
        self.next_sequence = 0;
        self.stop.store(false, Ordering::SeqCst);
    }

    /// Marks the start of one layer's labels.
    ///
    /// Reserved for per-layer bookkeeping. Labels are kept across layers and
    /// resolved against each other in one [`LabelCache::end`] pass.
    pub fn start_layer(&mut self, _layer: usize) {}

    /// Marks the end of the current layer's labels. See [`LabelCache::start_layer`].
    pub fn end_layer(&mut self) {}

    /// Sets the scale denominator labels with a scale range are filtered against.
    pub fn set_scale_denominator(&mut self, denominator: f64) {
        self.scale_denominator = denominator;
    }

    /// Returns a handle that can cancel a running [`LabelCache::end`] call.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            flag: self.stop.clone(),
        }
    }

    /// Collects one label, in screen coordinates.
    ///
    /// Labels with no text are ignored. With `scale_range` set the label is only
    /// drawn when the current scale denominator falls within the range.
    pub fn put<F>(
        &mut self,
        symbolizer: &dyn TextSymbolizer<F>,
        feature: &F,
        geometry: Geom,
        scale_range: Option<(f64, f64)>,
    ) {
        let Some(text) = symbolizer.label(feature) else {
            return;
        };
        if text.trim().is_empty() {
            return;
        }

        let priority = symbolizer.priority(feature).unwrap_or(DEFAULT_PRIORITY);
        let space_around = symbolizer
            .vendor_option("spaceAround")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0);
        let grouped = symbolizer
            .vendor_option("group")
            .map(is_truthy)
            .unwrap_or(false);

        if grouped {
            match self.grouped.entry(text.clone()) {
                Entry::Occupied(mut entry) => {
                    // Members pool their priority; the first member's style wins.
                    let item = entry.get_mut();
                    item.priority += priority;
                    item.geometry.push(geometry);
                    return;
                }
                Entry::Vacant(entry) => {
                    entry.insert(LabelItem {
                        text,
                        style: symbolizer.style().clone(),
                        placement: *symbolizer.placement(),
                        geometry: vec![geometry],
                        priority,
                        space_around,
                        scale_range,
                        sequence: self.next_sequence,
                    });
                }
            }
        } else {
            self.ungrouped.push(LabelItem {
                text,
                style: symbolizer.style().clone(),
                placement: *symbolizer.placement(),
                geometry: vec![geometry],
                priority,
                space_around,
                scale_range,
                sequence: self.next_sequence,
            });
        }

        self.next_sequence += 1;
    }

    /// Draws the collected labels onto the surface and empties the cache.
    ///
    /// Labels that fail to shape or draw are logged and skipped; one broken label
    /// never aborts the batch. Returns the number of labels drawn.
    pub fn end(&mut self, surface: &mut dyn LabelSurface, screen: Size) -> usize {
        let screen_rect = Rect::new(0.0, 0.0, screen.width(), screen.height());

        let mut items: Vec<LabelItem> = self.ungrouped.drain(..).collect();
        items.extend(self.grouped.drain().map(|(_, item)| item));

        // Restore submission order first so the priority sort below is deterministic,
        // then reverse into descending priority. Within equal priorities this draws
        // the most recently submitted label first.
        items.sort_by_key(|item| item.sequence);
        items.sort_by(|a, b| {
            a.priority
                .partial_cmp(&b.priority)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        items.reverse();

        let mut placed: Vec<PlacedGlyph> = Vec::new();
        let mut drawn = 0;
        for item in &items {
            if self.stop.load(Ordering::SeqCst) {
                break;
            }

            if let Some((min, max)) = item.scale_range {
                if self.scale_denominator < min || self.scale_denominator > max {
                    continue;
                }
            }

            match draw_one(item, surface, &screen_rect, &mut placed) {
                Ok(true) => drawn += 1,
                Ok(false) => {}
                Err(e) => log::debug!("label {:?} skipped: {e}", item.text),
            }
        }

        drawn
    }
}

fn draw_one(
    item: &LabelItem,
    surface: &mut dyn LabelSurface,
    screen_rect: &Rect,
    placed: &mut Vec<PlacedGlyph>,
) -> Result<bool, VespucciError> {
    let glyph = surface.shape(&item.text, &item.style)?;

    let Some(placement) = place(&item.geometry, &glyph, &item.placement, screen_rect) else {
        return Ok(false);
    };

    if goodness_of_fit(&placement.transform, &glyph, &placement.representative) < MIN_GOODNESS_FIT {
        return Ok(false);
    }

    // The whole glyph must land inside the display area, margins aside.
    if !screen_rect.contains_rect(
        &placement.transform.bounds(glyph.width, glyph.height),
        EdgeRule::AllowTouch,
    ) {
        return Ok(false);
    }

    let bounds = if item.space_around >= 0 {
        let bounds = placement
            .transform
            .bounds(glyph.width, glyph.height)
            .pad(item.space_around as f64);
        let conflict = placed.iter().any(|p| {
            p.bounds
                .map(|reserved| reserved.intersects(&bounds))
                .unwrap_or(false)
        });
        if conflict {
            return Ok(false);
        }
        Some(bounds)
    } else {
        None
    };

    let style = effective_style(&item.style);
    surface.draw_glyph(&item.text, &style, &placement.transform)?;
    placed.push(PlacedGlyph { bounds });
    Ok(true)
}

fn effective_style(style: &TextStyle) -> TextStyle {
    let mut style = style.clone();
    if style.fill.is_none() {
        style.fill = Some(Color::BLACK);
    }
    style
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "true" | "yes" | "1")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap as StdHashMap;

    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::geometry::{Contour, Point2d};

    struct TestSymbolizer {
        text: Option<String>,
        priority: Option<f64>,
        options: StdHashMap<String, String>,
        style: TextStyle,
        placement: LabelPlacement,
    }

    impl TestSymbolizer {
        fn new(text: &str) -> Self {
            Self {
                text: Some(text.to_string()),
                priority: None,
                options: StdHashMap::new(),
                style: TextStyle::default(),
                placement: LabelPlacement::default(),
            }
        }

        fn priority(mut self, priority: f64) -> Self {
            self.priority = Some(priority);
            self
        }

        fn option(mut self, name: &str, value: &str) -> Self {
            self.options.insert(name.to_string(), value.to_string());
            self
        }

        fn line_placement(mut self) -> Self {
            self.placement = LabelPlacement::line(0.5);
            self
        }
    }

    impl TextSymbolizer<()> for TestSymbolizer {
        fn label(&self, _feature: &()) -> Option<String> {
            self.text.clone()
        }

        fn priority(&self, _feature: &()) -> Option<f64> {
            self.priority
        }

        fn vendor_option(&self, name: &str) -> Option<&str> {
            self.options.get(name).map(String::as_str)
        }

        fn style(&self) -> &TextStyle {
            &self.style
        }

        fn placement(&self) -> &LabelPlacement {
            &self.placement
        }
    }

    #[derive(Default)]
    struct RecordingSurface {
        drawn: Vec<(String, TextStyle, PlacementTransform)>,
        stop_after_first: Option<StopHandle>,
    }

    impl LabelSurface for RecordingSurface {
        fn shape(&mut self, text: &str, style: &TextStyle) -> Result<ShapedGlyph, VespucciError> {
            if text == "unshapeable" {
                return Err(VespucciError::Shaping("no font covers the text".into()));
            }
            Ok(ShapedGlyph {
                width: text.chars().count() as f64 * style.font_size / 2.0,
                height: style.font_size,
            })
        }

        fn draw_glyph(
            &mut self,
            text: &str,
            style: &TextStyle,
            transform: &PlacementTransform,
        ) -> Result<(), VespucciError> {
            self.drawn.push((text.to_string(), style.clone(), *transform));
            if let Some(handle) = &self.stop_after_first {
                handle.stop();
            }
            Ok(())
        }
    }

    fn screen() -> Size {
        Size::new(1000.0, 1000.0)
    }

    fn point(x: f64, y: f64) -> Geom {
        Geom::Point(Point2d::new(x, y))
    }

    #[test]
    fn labels_draw_in_priority_order() {
        let mut cache = LabelCache::new();
        cache.start();

        cache.put(&TestSymbolizer::new("low").priority(1.0), &(), point(100.0, 100.0), None);
        cache.put(&TestSymbolizer::new("high").priority(10.0), &(), point(500.0, 500.0), None);
        cache.put(&TestSymbolizer::new("mid").priority(5.0), &(), point(800.0, 200.0), None);

        let mut surface = RecordingSurface::default();
        assert_eq!(cache.end(&mut surface, screen()), 3);

        let texts: Vec<&str> = surface.drawn.iter().map(|(t, _, _)| t.as_str()).collect();
        assert_eq!(texts, vec!["high", "mid", "low"]);
    }

    #[test]
    fn equal_priorities_draw_in_reverse_submission_order() {
        let mut cache = LabelCache::new();
        cache.start();

        cache.put(&TestSymbolizer::new("first"), &(), point(100.0, 100.0), None);
        cache.put(&TestSymbolizer::new("second"), &(), point(500.0, 500.0), None);

        let mut surface = RecordingSurface::default();
        cache.end(&mut surface, screen());

        let texts: Vec<&str> = surface.drawn.iter().map(|(t, _, _)| t.as_str()).collect();
        assert_eq!(texts, vec!["second", "first"]);
    }

    #[test]
    fn overlap_is_won_by_priority_regardless_of_submission_order() {
        for flipped in [false, true] {
            let mut cache = LabelCache::new();
            cache.start();

            let winner = TestSymbolizer::new("winner").priority(10.0);
            let loser = TestSymbolizer::new("loser").priority(1.0);

            // Both labels sit on the same point, so only one can survive.
            if flipped {
                cache.put(&loser, &(), point(300.0, 300.0), None);
                cache.put(&winner, &(), point(300.0, 300.0), None);
            } else {
                cache.put(&winner, &(), point(300.0, 300.0), None);
                cache.put(&loser, &(), point(300.0, 300.0), None);
            }

            let mut surface = RecordingSurface::default();
            assert_eq!(cache.end(&mut surface, screen()), 1);
            assert_eq!(surface.drawn[0].0, "winner");
        }
    }

    #[test]
    fn negative_space_around_opts_out_of_conflicts() {
        let mut cache = LabelCache::new();
        cache.start();

        cache.put(&TestSymbolizer::new("base"), &(), point(300.0, 300.0), None);
        cache.put(
            &TestSymbolizer::new("overlay").option("spaceAround", "-1"),
            &(),
            point(300.0, 300.0),
            None,
        );

        let mut surface = RecordingSurface::default();
        assert_eq!(cache.end(&mut surface, screen()), 2);
    }

    #[test]
    fn space_around_reserves_a_margin() {
        let mut cache = LabelCache::new();
        cache.start();

        // 100 px of padding makes two otherwise disjoint labels conflict.
        cache.put(
            &TestSymbolizer::new("padded").option("spaceAround", "100").priority(10.0),
            &(),
            point(300.0, 300.0),
            None,
        );
        cache.put(
            &TestSymbolizer::new("near").priority(1.0),
            &(),
            point(380.0, 300.0),
            None,
        );

        let mut surface = RecordingSurface::default();
        assert_eq!(cache.end(&mut surface, screen()), 1);
        assert_eq!(surface.drawn[0].0, "padded");
    }

    #[test]
    fn partially_offscreen_label_is_rejected() {
        let mut cache = LabelCache::new();
        cache.start();

        // A 60 px glyph centered at x = 990 pokes past the right screen edge.
        cache.put(&TestSymbolizer::new("riverbanks"), &(), point(990.0, 500.0), None);

        let mut surface = RecordingSurface::default();
        assert_eq!(cache.end(&mut surface, screen()), 0);
    }

    #[test]
    fn grouping_pools_priority_and_geometry() {
        let mut cache = LabelCache::new();
        cache.start();

        let road = TestSymbolizer::new("Main St").option("group", "true").priority(3.0);
        cache.put(
            &road,
            &(),
            Geom::Contour(Contour::open(vec![
                Point2d::new(0.0, 100.0),
                Point2d::new(200.0, 100.0),
            ])),
            None,
        );
        cache.put(
            &road,
            &(),
            Geom::Contour(Contour::open(vec![
                Point2d::new(200.0, 100.0),
                Point2d::new(400.0, 100.0),
            ])),
            None,
        );

        // A single competitor with a priority between one member and the pooled sum.
        cache.put(
            &TestSymbolizer::new("loner").priority(5.0),
            &(),
            point(500.0, 500.0),
            None,
        );

        let mut surface = RecordingSurface::default();
        assert_eq!(cache.end(&mut surface, screen()), 2);

        // The pooled priority (6.0) beats the loner's 5.0.
        assert_eq!(surface.drawn[0].0, "Main St");
        assert_eq!(surface.drawn.len(), 2);
    }

    #[test]
    fn ungrouped_identical_texts_stay_separate() {
        let mut cache = LabelCache::new();
        cache.start();

        cache.put(&TestSymbolizer::new("twin"), &(), point(100.0, 100.0), None);
        cache.put(&TestSymbolizer::new("twin"), &(), point(800.0, 800.0), None);

        let mut surface = RecordingSurface::default();
        assert_eq!(cache.end(&mut surface, screen()), 2);
    }

    #[test]
    fn grouped_line_label_is_placed_on_the_merged_line() {
        let mut cache = LabelCache::new();
        cache.start();

        let road = TestSymbolizer::new("Main St")
            .option("group", "yes")
            .line_placement();
        cache.put(
            &road,
            &(),
            Geom::Contour(Contour::open(vec![
                Point2d::new(0.0, 100.0),
                Point2d::new(200.0, 100.0),
            ])),
            None,
        );
        cache.put(
            &road,
            &(),
            Geom::Contour(Contour::open(vec![
                Point2d::new(200.0, 100.0),
                Point2d::new(400.0, 100.0),
            ])),
            None,
        );

        let mut surface = RecordingSurface::default();
        assert_eq!(cache.end(&mut surface, screen()), 1);

        // Centered on the merged 400 px line, not on either half.
        let (_, style, transform) = &surface.drawn[0];
        let width = "Main St".chars().count() as f64 * style.font_size / 2.0;
        let center = transform.apply(Point2d::new(width / 2.0, style.font_size / 2.0));
        assert_abs_diff_eq!(center, Point2d::new(200.0, 100.0), epsilon = 1e-9);
    }

    #[test]
    fn offscreen_and_broken_labels_are_skipped_quietly() {
        let mut cache = LabelCache::new();
        cache.start();

        cache.put(
            &TestSymbolizer::new("offscreen").line_placement(),
            &(),
            Geom::Contour(Contour::open(vec![
                Point2d::new(-500.0, -500.0),
                Point2d::new(-400.0, -500.0),
            ])),
            None,
        );
        cache.put(&TestSymbolizer::new("unshapeable"), &(), point(100.0, 100.0), None);
        cache.put(&TestSymbolizer::new("fine"), &(), point(500.0, 500.0), None);

        let mut surface = RecordingSurface::default();
        assert_eq!(cache.end(&mut surface, screen()), 1);
        assert_eq!(surface.drawn[0].0, "fine");
    }

    #[test]
    fn empty_text_is_ignored() {
        let mut cache = LabelCache::new();
        cache.start();

        cache.put(&TestSymbolizer::new("   "), &(), point(100.0, 100.0), None);
        let mut symbolizer = TestSymbolizer::new("x");
        symbolizer.text = None;
        cache.put(&symbolizer, &(), point(100.0, 100.0), None);

        let mut surface = RecordingSurface::default();
        assert_eq!(cache.end(&mut surface, screen()), 0);
    }

    #[test]
    fn default_fill_is_black() {
        let mut cache = LabelCache::new();
        cache.start();
        cache.put(&TestSymbolizer::new("plain"), &(), point(100.0, 100.0), None);

        let mut surface = RecordingSurface::default();
        cache.end(&mut surface, screen());
        assert_eq!(surface.drawn[0].1.fill, Some(Color::BLACK));
    }

    #[test]
    fn scale_range_filters_labels() {
        let mut cache = LabelCache::new();
        cache.start();
        cache.set_scale_denominator(50_000.0);

        cache.put(
            &TestSymbolizer::new("city"),
            &(),
            point(100.0, 100.0),
            Some((0.0, 100_000.0)),
        );
        cache.put(
            &TestSymbolizer::new("street"),
            &(),
            point(500.0, 500.0),
            Some((0.0, 10_000.0)),
        );

        let mut surface = RecordingSurface::default();
        assert_eq!(cache.end(&mut surface, screen()), 1);
        assert_eq!(surface.drawn[0].0, "city");
    }

    #[test]
    fn stop_cancels_the_rest_of_the_batch() {
        let mut cache = LabelCache::new();
        cache.start();

        cache.put(&TestSymbolizer::new("a"), &(), point(100.0, 100.0), None);
        cache.put(&TestSymbolizer::new("b"), &(), point(400.0, 400.0), None);
        cache.put(&TestSymbolizer::new("c"), &(), point(700.0, 700.0), None);

        let mut surface = RecordingSurface {
            stop_after_first: Some(cache.stop_handle()),
            ..Default::default()
        };
        assert_eq!(cache.end(&mut surface, screen()), 1);
    }

    #[test]
    fn layer_brackets_keep_labels_from_every_layer() {
        let mut cache = LabelCache::new();
        cache.start();

        cache.start_layer(0);
        cache.put(&TestSymbolizer::new("roads"), &(), point(100.0, 100.0), None);
        cache.end_layer();

        cache.start_layer(1);
        cache.put(&TestSymbolizer::new("rivers"), &(), point(500.0, 500.0), None);
        cache.end_layer();

        let mut surface = RecordingSurface::default();
        assert_eq!(cache.end(&mut surface, screen()), 2);
    }

    #[test]
    fn halo_is_handed_to_the_surface() {
        let mut cache = LabelCache::new();
        cache.start();

        let halo = Halo {
            color: Color::WHITE,
            radius: 2.0,
        };
        let mut symbolizer = TestSymbolizer::new("harbor");
        symbolizer.style.halo = Some(halo);
        cache.put(&symbolizer, &(), point(400.0, 400.0), None);

        let mut surface = RecordingSurface::default();
        assert_eq!(cache.end(&mut surface, screen()), 1);
        assert_eq!(surface.drawn[0].1.halo, Some(halo));
    }
}
