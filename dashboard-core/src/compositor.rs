/// Full-frame rendering of the dashboard and status screens.
///
/// Everything here only draws into a `DrawTarget`; presenting the frame is
/// the board's job. The layout targets a 128x64 monochrome panel.
use core::fmt::Write as _;

use embedded_graphics::{
    mono_font::{ascii::FONT_10X20, iso_8859_1::FONT_6X10, MonoTextStyle},
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{Line, PrimitiveStyle, Rectangle},
    text::{Alignment, Baseline, Text, TextStyle, TextStyleBuilder},
};
use heapless::String;

use crate::clock::{date_part, day_of_week_label, WallClock};
use crate::connectivity::ConnectionQuality;
use crate::interaction::AnimationStep;
use crate::reading::SensorReading;

pub const DISPLAY_WIDTH: i32 = 128;
pub const DISPLAY_HEIGHT: i32 = 64;

/// Default origin (the dot) of the Wi-Fi indicator
pub const WIFI_ICON_ORIGIN: Point = Point::new(12, 41);

/// Wi-Fi indicator position on the setup screen
pub const SETUP_ICON_ORIGIN: Point = Point::new(64, 26);

/// Second sensor row, reserved for a future value
pub const SECONDARY_ROW_PLACEHOLDER: &str = "WDAY $xxx.yy";

pub const SETUP_AP_SSID: &str = "dd_setup";
pub const SETUP_AP_PASSWORD: &str = "12345678";

const CENTER: Point = Point::new(DISPLAY_WIDTH / 2, DISPLAY_HEIGHT / 2);

// Arc segments relative to the dot, innermost arc first
const WIFI_ARCS: [[(Point, Point); 3]; 3] = [
    [
        (Point::new(-3, -2), Point::new(-2, -2)),
        (Point::new(-1, -3), Point::new(2, -3)),
        (Point::new(3, -2), Point::new(4, -2)),
    ],
    [
        (Point::new(-4, -5), Point::new(-3, -5)),
        (Point::new(-2, -6), Point::new(3, -6)),
        (Point::new(4, -5), Point::new(5, -5)),
    ],
    [
        (Point::new(-6, -8), Point::new(-5, -8)),
        (Point::new(-4, -9), Point::new(5, -9)),
        (Point::new(6, -8), Point::new(7, -8)),
    ],
];

// Mirrored side-line pairs as (left x, top y, bottom y), outermost first
const SIDE_LINES: [(i32, i32, i32); 3] = [(10, 36, 40), (15, 32, 44), (20, 28, 48)];

/// What the Wi-Fi indicator shows this frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiGlyph {
    Signal(ConnectionQuality),
    /// Arcs revealed one by one while a link is being established
    Animated(AnimationStep),
}

impl WifiGlyph {
    fn arcs(self) -> u8 {
        match self {
            WifiGlyph::Signal(quality) => quality.arcs(),
            WifiGlyph::Animated(step) => step.value(),
        }
    }
}

/// Everything one dashboard frame is drawn from
#[derive(Debug, Clone)]
pub struct Frame<'a> {
    pub clock: WallClock,
    pub inside: &'a SensorReading,
    pub outside: &'a SensorReading,
    pub animation: AnimationStep,
    pub show_activity_indicator: bool,
    pub wifi: Option<WifiGlyph>,
}

pub fn sensor_row(inside: &SensorReading, outside: &SensorReading) -> String<32> {
    let mut row = String::new();
    let _ = write!(row, "{}°C | {}°C", inside, outside);
    row
}

pub fn date_row(clock: &WallClock) -> String<24> {
    let mut row = String::new();
    let formatted = clock.formatted_date();
    let _ = write!(
        row,
        "{}  {}",
        date_part(&formatted),
        day_of_week_label(clock.day_of_week())
    );
    row
}

fn small_text() -> MonoTextStyle<'static, BinaryColor> {
    MonoTextStyle::new(&FONT_6X10, BinaryColor::On)
}

fn centered(baseline: Baseline) -> TextStyle {
    TextStyleBuilder::new()
        .alignment(Alignment::Center)
        .baseline(baseline)
        .build()
}

fn draw_line<D>(target: &mut D, from: Point, to: Point) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    Line::new(from, to)
        .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
        .draw(target)
}

/// Draw the dot and the lowest `arcs` arcs of the Wi-Fi indicator.
pub fn draw_wifi_icon<D>(target: &mut D, origin: Point, arcs: u8) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    for arc in WIFI_ARCS.iter().take(arcs as usize) {
        for (from, to) in arc {
            draw_line(target, origin + *from, origin + *to)?;
        }
    }

    Rectangle::new(origin, Size::new(2, 2))
        .into_styled(PrimitiveStyle::with_fill(BinaryColor::On))
        .draw(target)
}

/// Activity decoration: step 1 lights the inner pair, each further step
/// adds the next pair outwards.
pub fn draw_side_lines<D>(target: &mut D, step: AnimationStep) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    let lit = step.value() as usize;
    for &(x, top, bottom) in SIDE_LINES.iter().rev().take(lit) {
        let mirrored = DISPLAY_WIDTH - x;
        draw_line(target, Point::new(x, top), Point::new(x, bottom))?;
        draw_line(target, Point::new(mirrored, top), Point::new(mirrored, bottom))?;
    }
    Ok(())
}

pub fn draw_dashboard<D>(target: &mut D, frame: &Frame<'_>) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    target.clear(BinaryColor::Off)?;

    // Clock row
    let time = frame.clock.formatted_time();
    Text::with_text_style(
        &time,
        Point::new(CENTER.x, 2),
        MonoTextStyle::new(&FONT_10X20, BinaryColor::On),
        centered(Baseline::Top),
    )
    .draw(target)?;

    // Sensor rows between two rules
    draw_line(target, Point::new(25, 25), Point::new(103, 25))?;
    let readings = sensor_row(frame.inside, frame.outside);
    Text::with_text_style(&readings, Point::new(CENTER.x, 26), small_text(), centered(Baseline::Top))
        .draw(target)?;
    Text::with_text_style(
        SECONDARY_ROW_PLACEHOLDER,
        Point::new(CENTER.x, 38),
        small_text(),
        centered(Baseline::Top),
    )
    .draw(target)?;
    draw_line(target, Point::new(25, 51), Point::new(103, 51))?;

    // Date row
    let date = date_row(&frame.clock);
    Text::with_text_style(&date, Point::new(CENTER.x, 52), small_text(), centered(Baseline::Top))
        .draw(target)?;
    draw_line(target, Point::new(82, 51), Point::new(82, DISPLAY_HEIGHT))?;

    if frame.show_activity_indicator {
        draw_side_lines(target, frame.animation)?;
    }

    if let Some(glyph) = frame.wifi {
        draw_wifi_icon(target, WIFI_ICON_ORIGIN, glyph.arcs())?;
    }

    Ok(())
}

/// First-run screen with the credentials of the setup access point
pub fn draw_setup_screen<D>(target: &mut D, step: AnimationStep) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    target.clear(BinaryColor::Off)?;

    let mut ssid: String<32> = String::new();
    let _ = write!(ssid, "SSID: {}", SETUP_AP_SSID);
    let mut password: String<32> = String::new();
    let _ = write!(password, "PW:   {}", SETUP_AP_PASSWORD);

    Text::with_baseline(&ssid, Point::new(30, 40), small_text(), Baseline::Top).draw(target)?;
    Text::with_baseline(&password, Point::new(30, 50), small_text(), Baseline::Top).draw(target)?;

    draw_wifi_icon(target, SETUP_ICON_ORIGIN, step.value())
}

/// A single centered line, optionally with the animated Wi-Fi indicator.
pub fn draw_status<D>(target: &mut D, message: &str, icon: Option<AnimationStep>) -> Result<(), D::Error>
where
    D: DrawTarget<Color = BinaryColor>,
{
    target.clear(BinaryColor::Off)?;
    Text::with_text_style(message, CENTER, small_text(), centered(Baseline::Middle)).draw(target)?;

    if let Some(step) = icon {
        draw_wifi_icon(target, WIFI_ICON_ORIGIN, step.value())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;

    struct Panel {
        pixels: [[bool; 128]; 64],
    }

    impl Panel {
        fn new() -> Self {
            Self {
                pixels: [[false; 128]; 64],
            }
        }

        fn on(&self, x: i32, y: i32) -> bool {
            self.pixels[y as usize][x as usize]
        }

        fn lit_in(&self, area: Rectangle) -> usize {
            area.points().filter(|p| self.on(p.x, p.y)).count()
        }
    }

    impl OriginDimensions for Panel {
        fn size(&self) -> Size {
            Size::new(128, 64)
        }
    }

    impl DrawTarget for Panel {
        type Color = BinaryColor;
        type Error = Infallible;

        fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
        where
            I: IntoIterator<Item = Pixel<Self::Color>>,
        {
            for Pixel(point, color) in pixels {
                if (0..128).contains(&point.x) && (0..64).contains(&point.y) {
                    self.pixels[point.y as usize][point.x as usize] = color.is_on();
                }
            }
            Ok(())
        }
    }

    fn frame<'a>(inside: &'a SensorReading, outside: &'a SensorReading) -> Frame<'a> {
        Frame {
            clock: WallClock::from_unix(1_709_245_805, 0),
            inside,
            outside,
            animation: AnimationStep::default(),
            show_activity_indicator: false,
            wifi: None,
        }
    }

    #[test]
    fn test_rows() {
        let inside = SensorReading::from_text("21.5");
        let outside = SensorReading::no_value();
        assert_eq!(sensor_row(&inside, &outside).as_str(), "21.5°C | -.-°C");

        let clock = WallClock::from_unix(1_709_245_805, 0);
        assert_eq!(date_row(&clock).as_str(), "2024-02-29  Thu");
    }

    #[test]
    fn test_wifi_icon_arcs() {
        let mut panel = Panel::new();
        draw_wifi_icon(&mut panel, WIFI_ICON_ORIGIN, 0).unwrap();
        assert!(panel.on(12, 41) && panel.on(13, 42));
        assert!(!panel.on(12, 38));

        let mut panel = Panel::new();
        draw_wifi_icon(&mut panel, WIFI_ICON_ORIGIN, 2).unwrap();
        assert!(panel.on(12, 38)); // lower arc
        assert!(panel.on(12, 35)); // middle arc
        assert!(!panel.on(12, 32)); // top arc

        let mut panel = Panel::new();
        draw_wifi_icon(&mut panel, WIFI_ICON_ORIGIN, 3).unwrap();
        assert!(panel.on(12, 32));
        assert!(panel.on(19, 33));
    }

    #[test]
    fn test_side_lines_follow_step() {
        let mut step = AnimationStep::default();
        let mut lit = Vec::new();
        for _ in 0..4 {
            let mut panel = Panel::new();
            draw_side_lines(&mut panel, step).unwrap();
            lit.push([panel.on(10, 38), panel.on(15, 38), panel.on(20, 38), panel.on(108, 38)]);
            step.advance();
        }
        assert_eq!(
            lit,
            vec![
                [false, false, false, false],
                [false, false, true, true],
                [false, true, true, true],
                [true, true, true, true],
            ]
        );
    }

    #[test]
    fn test_dashboard_layout() {
        let inside = SensorReading::from_text("21.5");
        let outside = SensorReading::from_text("-3.5");
        let mut panel = Panel::new();
        let mut frame = frame(&inside, &outside);
        draw_dashboard(&mut panel, &frame).unwrap();

        // clock, rules and date all present
        assert!(panel.lit_in(Rectangle::new(Point::new(24, 0), Size::new(80, 22))) > 0);
        assert!(panel.on(25, 25) && panel.on(103, 51) && panel.on(82, 63));
        assert!(panel.lit_in(Rectangle::new(Point::new(0, 52), Size::new(128, 12))) > 0);
        // no indicator drawn
        assert!(!panel.on(12, 41) && !panel.on(13, 42) && !panel.on(20, 46));

        frame.wifi = Some(WifiGlyph::Signal(ConnectionQuality::Weak));
        frame.show_activity_indicator = true;
        frame.animation.advance();
        draw_dashboard(&mut panel, &frame).unwrap();
        assert!(panel.on(12, 41) && panel.on(12, 38) && !panel.on(12, 35));
        assert!(panel.on(20, 46) && panel.on(108, 48));
    }

    #[test]
    fn test_status_screen_is_redrawn_from_blank() {
        let mut panel = Panel::new();
        draw_setup_screen(&mut panel, AnimationStep::default()).unwrap();
        assert!(panel.on(64, 26));

        draw_status(&mut panel, "Turning off...", None).unwrap();
        assert!(!panel.on(64, 26));
        assert!(panel.lit_in(Rectangle::new(Point::new(0, 26), Size::new(128, 12))) > 0);
    }
}
