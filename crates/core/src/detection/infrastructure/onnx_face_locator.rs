/// YOLO-pose face locator using ONNX Runtime via `ort`.
///
/// Produces face boxes plus the model's 5 keypoints (eyes, nose, mouth
/// corners) in original frame coordinates.
use std::path::Path;

use crate::detection::domain::expression_classifier::{ClassifierLoadError, DetectionError};
use crate::shared::frame::Frame;
use crate::shared::point::Point;

/// Fallback model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

const NMS_IOU_THRESH: f64 = 0.45;

/// 5 keypoints × (x, y, conf).
const NUM_KEYPOINT_VALUES: usize = 15;

const KEYPOINT_CONF_THRESH: f64 = 0.5;

/// A face box in frame pixels with its visible keypoints.
#[derive(Clone, Debug, PartialEq)]
pub struct LocatedFace {
    pub bbox: [f64; 4],
    pub confidence: f64,
    pub keypoints: Vec<Point>,
}

pub struct OnnxFaceLocator {
    session: ort::session::Session,
    confidence: f64,
    input_size: u32,
}

impl OnnxFaceLocator {
    /// Loads the model; the input resolution comes from its NCHW input
    /// shape, falling back to 640 when that is dynamic.
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, ClassifierLoadError> {
        let session = ort::session::Session::builder()
            .map_err(|e| ClassifierLoadError::Session(e.to_string()))?
            .commit_from_file(model_path)
            .map_err(|e| ClassifierLoadError::Session(e.to_string()))?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| match input.dtype() {
                ort::value::ValueType::Tensor { ref shape, .. }
                    if shape.len() >= 4 && shape[2] > 0 =>
                {
                    Some(shape[2] as u32)
                }
                _ => None,
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        Ok(Self {
            session,
            confidence,
            input_size,
        })
    }

    pub fn locate(&mut self, frame: &Frame) -> Result<Vec<LocatedFace>, DetectionError> {
        let (input_tensor, letterbox) = letterbox(frame, self.input_size);
        let input_value = ort::value::Tensor::from_array(input_tensor)
            .map_err(|e| DetectionError::Inference(e.to_string()))?;
        let outputs = self
            .session
            .run(ort::inputs![input_value])
            .map_err(|e| DetectionError::Inference(e.to_string()))?;
        if outputs.len() == 0 {
            return Err(DetectionError::Output("face model produced no outputs".into()));
        }
        let tensor = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| DetectionError::Output(e.to_string()))?;
        let shape = tensor.shape().to_vec();
        if shape.len() != 3 {
            return Err(DetectionError::Output(format!(
                "unexpected face model output shape: {shape:?}"
            )));
        }
        let data = tensor
            .as_slice()
            .ok_or_else(|| DetectionError::Output("face model output is not contiguous".into()))?;

        let mut candidates = parse_rows(data, &shape, self.confidence, &letterbox);
        Ok(nms(&mut candidates, NMS_IOU_THRESH))
    }
}

/// Scale and padding applied by [`letterbox`], for mapping model
/// coordinates back to the frame.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Letterbox {
    scale: f64,
    pad_x: f64,
    pad_y: f64,
}

impl Letterbox {
    fn to_frame(self, x: f64, y: f64) -> (f64, f64) {
        ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }
}

/// Letterbox-resize a frame to `target_size` × `target_size` NCHW float32.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, Letterbox) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = (fw * scale).round() as u32;
    let new_h = (fh * scale).round() as u32;
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            for c in 0..3 {
                tensor[[0, c, pad_y as usize + y, pad_x as usize + x]] =
                    src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (
        tensor,
        Letterbox {
            scale,
            pad_x: pad_x as f64,
            pad_y: pad_y as f64,
        },
    )
}

/// Decodes `[1, features, detections]` or `[1, detections, features]`
/// output rows of `[cx, cy, w, h, conf, kp0_x, kp0_y, kp0_conf, ...]`.
fn parse_rows(
    data: &[f32],
    shape: &[usize],
    min_confidence: f64,
    letterbox: &Letterbox,
) -> Vec<LocatedFace> {
    let transposed = shape[1] < shape[2];
    let (num_dets, num_feats) = if transposed {
        (shape[2], shape[1])
    } else {
        (shape[1], shape[2])
    };
    if num_feats < 5 {
        return Vec::new();
    }
    let value = |det: usize, feat: usize| -> f64 {
        if transposed {
            data[feat * num_dets + det] as f64
        } else {
            data[det * num_feats + feat] as f64
        }
    };

    let mut faces = Vec::new();
    for i in 0..num_dets {
        let confidence = value(i, 4);
        if confidence < min_confidence {
            continue;
        }

        let (cx, cy, w, h) = (value(i, 0), value(i, 1), value(i, 2), value(i, 3));
        let (x1, y1) = letterbox.to_frame(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = letterbox.to_frame(cx + w / 2.0, cy + h / 2.0);

        let mut keypoints = Vec::new();
        if num_feats >= 5 + NUM_KEYPOINT_VALUES {
            for k in 0..5 {
                if value(i, 5 + k * 3 + 2) >= KEYPOINT_CONF_THRESH {
                    let (kx, ky) = letterbox.to_frame(value(i, 5 + k * 3), value(i, 5 + k * 3 + 1));
                    keypoints.push(Point::new(kx, ky));
                }
            }
        }

        faces.push(LocatedFace {
            bbox: [x1, y1, x2, y2],
            confidence,
            keypoints,
        });
    }
    faces
}

/// Greedy NMS: sort by confidence descending, suppress overlapping boxes.
fn nms(faces: &mut [LocatedFace], iou_thresh: f64) -> Vec<LocatedFace> {
    faces.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<LocatedFace> = Vec::new();
    for face in faces.iter() {
        if keep
            .iter()
            .all(|kept| bbox_iou(&kept.bbox, &face.bbox) <= iou_thresh)
        {
            keep.push(face.clone());
        }
    }
    keep
}

fn bbox_iou(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    inter / (area_a + area_b - inter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn face(bbox: [f64; 4], confidence: f64) -> LocatedFace {
        LocatedFace {
            bbox,
            confidence,
            keypoints: Vec::new(),
        }
    }

    #[test]
    fn test_letterbox_default_camera_frame() {
        // 640x480 → 640x640: scale 1.0, 80px bars top and bottom
        let frame = Frame::new(vec![128u8; 640 * 480 * 3], 640, 480, 0);
        let (tensor, lb) = letterbox(&frame, 640);

        assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
        assert_relative_eq!(lb.scale, 1.0);
        assert_relative_eq!(lb.pad_x, 0.0);
        assert_relative_eq!(lb.pad_y, 80.0);
        assert_relative_eq!(tensor[[0, 0, 0, 0]], 114.0 / 255.0, epsilon = 1e-6);
        assert_relative_eq!(tensor[[0, 0, 80, 0]], 128.0 / 255.0, epsilon = 1e-6);
    }

    /// Packs detection rows into the `[1, features, detections]` layout.
    fn feature_major(rows: &[Vec<f32>]) -> Vec<f32> {
        let feats = rows[0].len();
        let mut data = vec![0.0f32; feats * rows.len()];
        for (det, row) in rows.iter().enumerate() {
            for (feat, v) in row.iter().enumerate() {
                data[feat * rows.len() + det] = *v;
            }
        }
        data
    }

    #[test]
    fn test_parse_rows_maps_back_to_frame_and_filters_keypoints() {
        // 21 detections of 20 features, feature-major; only the first scores.
        let mut rows = vec![vec![0.0f32; 20]; 21];
        rows[0][..5].copy_from_slice(&[100.0, 180.0, 40.0, 40.0, 0.9]);
        rows[0][5..8].copy_from_slice(&[90.0, 170.0, 0.95]); // visible
        rows[0][8..11].copy_from_slice(&[110.0, 170.0, 0.1]); // hidden
        let lb = Letterbox {
            scale: 1.0,
            pad_x: 0.0,
            pad_y: 80.0,
        };

        let faces = parse_rows(&feature_major(&rows), &[1, 20, 21], 0.4, &lb);

        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].bbox, [80.0, 80.0, 120.0, 120.0]);
        assert_eq!(faces[0].keypoints, vec![Point::new(90.0, 90.0)]);
    }

    #[test]
    fn test_parse_rows_detection_major_layout_and_threshold() {
        // [1, 6 detections, 5 features], row-major
        let mut rows = vec![vec![0.0f32; 5]; 6];
        rows[0].copy_from_slice(&[10.0, 10.0, 4.0, 4.0, 0.8]);
        rows[1].copy_from_slice(&[50.0, 50.0, 4.0, 4.0, 0.2]);
        let data: Vec<f32> = rows.concat();
        let lb = Letterbox {
            scale: 2.0,
            pad_x: 0.0,
            pad_y: 0.0,
        };

        let faces = parse_rows(&data, &[1, 6, 5], 0.4, &lb);

        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].bbox, [4.0, 4.0, 6.0, 6.0]);
        assert!(faces[0].keypoints.is_empty());
    }

    #[test]
    fn test_nms_keeps_highest_of_overlapping() {
        let mut faces = vec![
            face([0.0, 0.0, 100.0, 100.0], 0.5),
            face([2.0, 2.0, 102.0, 102.0], 0.9),
            face([300.0, 300.0, 350.0, 350.0], 0.6),
        ];

        let kept = nms(&mut faces, 0.3);

        assert_eq!(kept.len(), 2);
        assert_relative_eq!(kept[0].confidence, 0.9);
        assert_relative_eq!(kept[1].confidence, 0.6);
    }

    #[test]
    fn test_bbox_iou_bounds() {
        let b = [0.0, 0.0, 10.0, 10.0];
        assert_relative_eq!(bbox_iou(&b, &b), 1.0);
        assert_eq!(bbox_iou(&b, &[20.0, 20.0, 30.0, 30.0]), 0.0);
    }
}
