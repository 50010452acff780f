//! Frame annotation

use crate::error::VisionError;
use crate::postprocess::Detection;
use opencv::{
    core::{Mat, Point, Rect, Scalar},
    imgproc,
    prelude::*,
};

const BOX_THICKNESS: i32 = 2;
const FONT_SCALE: f64 = 0.5;

fn box_color() -> Scalar {
    // Yellow, BGR order.
    Scalar::new(0.0, 255.0, 255.0, 0.0)
}

/// Draw the surviving detections onto a copy of the frame.
///
/// Each box gets a rectangle and a `"label: confidence"` caption just above
/// it, or below the top edge when the box touches it. The source frame and
/// the detection set are left untouched.
pub fn annotate(frame: &Mat, detections: &[Detection]) -> Result<Mat, VisionError> {
    let mut canvas = frame.try_clone()?;

    for det in detections {
        let x = det.bbox.x as i32;
        let y = det.bbox.y as i32;
        let width = det.bbox.width as i32;
        let height = det.bbox.height as i32;

        imgproc::rectangle(
            &mut canvas,
            Rect::new(x, y, width, height),
            box_color(),
            BOX_THICKNESS,
            imgproc::LINE_8,
            0,
        )?;

        let caption = format!("{}: {:.2}", det.label, det.confidence);
        let text_y = if y - 5 > 10 { y - 5 } else { y + 20 };
        imgproc::put_text(
            &mut canvas,
            &caption,
            Point::new(x, text_y),
            imgproc::FONT_HERSHEY_SIMPLEX,
            FONT_SCALE,
            box_color(),
            BOX_THICKNESS,
            imgproc::LINE_8,
            false,
        )?;
    }

    Ok(canvas)
}
