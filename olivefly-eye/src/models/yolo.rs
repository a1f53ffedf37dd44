//! YOLO object detection model

use crate::config::DetectorConfig;
use crate::detector::{Detector, DetectorOutput};
use crate::error::VisionError;
use crate::utils::rgb_to_chw_tensor;
use image::RgbImage;
use olivefly_core::{ClassNameTable, RawBox, RawValue};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use parking_lot::Mutex;
use std::cmp::Ordering;
use tracing::{debug, info, warn};

/// COCO class names (80 classes)
pub const COCO_CLASSES: &[&str] = &[
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat",
    "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack",
    "umbrella", "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball",
    "kite", "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket",
    "bottle", "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple",
    "sandwich", "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair",
    "couch", "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse",
    "remote", "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator",
    "book", "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

/// One box decoded from the raw output tensor, before NMS.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub class_id: usize,
    pub score: f32,
    /// `[x1, y1, x2, y2]` in source image pixels
    pub bbox: [f32; 4],
}

/// Geometry needed to map model-space boxes back onto the source image.
#[derive(Debug, Clone, Copy)]
pub struct InputGeometry {
    pub input_width: u32,
    pub input_height: u32,
    pub image_width: u32,
    pub image_height: u32,
}

/// YOLO model for object detection
pub struct YoloDetector {
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
    /// Empty when the export carries no usable `names` metadata
    class_names: ClassNameTable,
    config: DetectorConfig,
}

impl YoloDetector {
    /// Load a YOLO ONNX export
    pub fn new(config: DetectorConfig) -> Result<Self, VisionError> {
        config.validate().map_err(VisionError::Config)?;

        let session = Session::builder()
            .map_err(|e| VisionError::Ort(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| VisionError::Ort(format!("Failed to set optimization level: {}", e)))?
            .with_intra_threads(config.intra_threads)
            .map_err(|e| VisionError::Ort(format!("Failed to set intra threads: {}", e)))?
            .commit_from_file(&config.model_path)
            .map_err(|e| VisionError::Ort(format!("Failed to load YOLO model: {}", e)))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| VisionError::Ort("Model declares no inputs".to_string()))?;
        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .ok_or_else(|| VisionError::Ort("Model declares no outputs".to_string()))?;

        let names_metadata = session
            .metadata()
            .ok()
            .and_then(|metadata| metadata.custom("names").ok().flatten());
        let class_names = match names_metadata.as_deref().and_then(parse_names_metadata) {
            Some(table) => table,
            None => {
                warn!("Model has no usable 'names' metadata");
                ClassNameTable::new()
            }
        };

        info!(
            "YOLO model loaded from {:?} ({} classes, input {})",
            config.model_path,
            class_names.len(),
            input_name
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
            class_names,
            config,
        })
    }

    /// Run the session and decode its output. Also returns the class count the
    /// output tensor was decoded with.
    fn infer(&self, image: &RgbImage) -> Result<(Vec<Prediction>, usize), VisionError> {
        let side = self.config.input_size;
        let data = rgb_to_chw_tensor(image, side, side)?;
        let input = Tensor::from_array(([1usize, 3, side as usize, side as usize], data))
            .map_err(|e| VisionError::Ort(format!("Failed to create input tensor: {}", e)))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input])
            .map_err(|e| VisionError::Inference(format!("YOLO inference failed: {}", e)))?;

        let output = outputs
            .get(self.output_name.as_str())
            .ok_or_else(|| VisionError::Inference(format!("Model missing output {}", self.output_name)))?;
        let (shape, values) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| VisionError::Ort(format!("Failed to extract output tensor: {}", e)))?;
        let dims: Vec<i64> = shape.iter().copied().collect();
        debug!("YOLO output shape: {:?}", dims);

        let geometry = InputGeometry {
            input_width: side,
            input_height: side,
            image_width: image.width(),
            image_height: image.height(),
        };
        let num_classes = if self.class_names.is_empty() {
            None
        } else {
            Some(self.class_names.len())
        };

        let predictions = decode_predictions(&dims, values, num_classes, self.config.score_floor, geometry)?;
        let decoded_classes =
            num_classes.unwrap_or_else(|| (dims[1].min(dims[2]) as usize).saturating_sub(4));
        Ok((
            apply_nms(predictions, self.config.iou_threshold, self.config.max_detections),
            decoded_classes,
        ))
    }
}

impl Detector for YoloDetector {
    fn detect(&self, image: &RgbImage) -> Result<DetectorOutput, VisionError> {
        debug!("Running YOLO detection on {}x{} image", image.width(), image.height());
        let (predictions, num_classes) = self.infer(image)?;
        debug!("YOLO detected {} objects", predictions.len());

        // unlabelled 80-class exports are assumed to be stock COCO weights
        let class_names = if self.class_names.is_empty() && num_classes == COCO_CLASSES.len() {
            coco_class_names()
        } else {
            self.class_names.clone()
        };

        let boxes = predictions
            .into_iter()
            .map(|p| RawBox {
                cls: RawValue::Scalar(p.class_id as f64),
                conf: RawValue::Scalar(p.score as f64),
                xyxy: p.bbox.iter().map(|&c| c as f64).collect(),
            })
            .collect();

        Ok(DetectorOutput {
            class_names,
            boxes,
        })
    }
}

/// The 80 COCO labels keyed by index.
pub fn coco_class_names() -> ClassNameTable {
    COCO_CLASSES
        .iter()
        .enumerate()
        .map(|(id, name)| (id as i64, *name))
        .collect()
}

/// Parse the `names` metadata written by Ultralytics exports,
/// e.g. `{0: 'olive fly', 1: 'leaf'}`. JSON-style quoting is accepted too.
pub fn parse_names_metadata(raw: &str) -> Option<ClassNameTable> {
    let body = raw.trim().strip_prefix('{')?.strip_suffix('}')?;
    let mut table = ClassNameTable::new();
    let mut rest = body.trim();

    while !rest.is_empty() {
        let colon = rest.find(':')?;
        let key = rest[..colon].trim().trim_matches(|c| c == '\'' || c == '"');
        let class_id: i64 = key.parse().ok()?;

        let value = rest[colon + 1..].trim_start();
        let quote = value.chars().next().filter(|c| *c == '\'' || *c == '"')?;
        let close = value[1..].find(quote)? + 1;
        table.insert(class_id, &value[1..close]);

        rest = value[close + 1..].trim_start();
        rest = rest.strip_prefix(',').unwrap_or(rest).trim_start();
    }

    if table.is_empty() {
        None
    } else {
        Some(table)
    }
}

/// Decode a YOLOv8-style output, `[1, 4 + nc, N]` or its transpose `[1, N, 4 + nc]`.
///
/// Boxes arrive as centre/size in model input pixels and leave as corners in
/// source image pixels, clipped to the image. Anchors whose best class scores
/// below `score_floor` are dropped.
pub fn decode_predictions(
    dims: &[i64],
    values: &[f32],
    num_classes: Option<usize>,
    score_floor: f32,
    geometry: InputGeometry,
) -> Result<Vec<Prediction>, VisionError> {
    if dims.len() != 3 || dims.iter().any(|&d| d <= 0) {
        return Err(VisionError::Inference(format!("Unexpected output shape {:?}", dims)));
    }
    if dims[0] != 1 {
        return Err(VisionError::Inference(format!("Expected batch of 1, got {}", dims[0])));
    }

    let (a, b) = (dims[1] as usize, dims[2] as usize);
    let expected = a
        .checked_mul(b)
        .ok_or_else(|| VisionError::Inference("Output shape would overflow".to_string()))?;
    if values.len() != expected {
        return Err(VisionError::Inference(format!(
            "Output has {} values, shape {:?} needs {}",
            values.len(),
            dims,
            expected
        )));
    }

    // without a class count the channel axis is the shorter one
    let channels_first = match num_classes {
        Some(nc) if a == nc + 4 => true,
        Some(nc) if b == nc + 4 => false,
        Some(nc) => {
            return Err(VisionError::Inference(format!(
                "Output shape {:?} does not match {} classes",
                dims, nc
            )))
        }
        None => a <= b,
    };
    let (channels, anchors) = if channels_first { (a, b) } else { (b, a) };
    if channels <= 4 {
        return Err(VisionError::Inference(format!("Output has no class channels: {:?}", dims)));
    }

    let at = |channel: usize, anchor: usize| -> f32 {
        if channels_first {
            values[channel * anchors + anchor]
        } else {
            values[anchor * channels + channel]
        }
    };

    let scale_x = geometry.image_width as f32 / geometry.input_width as f32;
    let scale_y = geometry.image_height as f32 / geometry.input_height as f32;
    let max_x = geometry.image_width as f32;
    let max_y = geometry.image_height as f32;

    let mut predictions = Vec::new();
    for anchor in 0..anchors {
        let mut best_class = 0usize;
        let mut best_score = f32::NEG_INFINITY;
        for class_id in 0..channels - 4 {
            let score = at(4 + class_id, anchor);
            if score > best_score {
                best_score = score;
                best_class = class_id;
            }
        }

        if !best_score.is_finite() || best_score < score_floor {
            continue;
        }

        let (cx, cy, w, h) = (at(0, anchor), at(1, anchor), at(2, anchor), at(3, anchor));
        if !(cx.is_finite() && cy.is_finite() && w.is_finite() && h.is_finite()) || w <= 0.0 || h <= 0.0 {
            continue;
        }

        let x1 = ((cx - w / 2.0) * scale_x).clamp(0.0, max_x);
        let y1 = ((cy - h / 2.0) * scale_y).clamp(0.0, max_y);
        let x2 = ((cx + w / 2.0) * scale_x).clamp(0.0, max_x);
        let y2 = ((cy + h / 2.0) * scale_y).clamp(0.0, max_y);
        if x2 <= x1 || y2 <= y1 {
            continue;
        }

        predictions.push(Prediction {
            class_id: best_class,
            score: best_score,
            bbox: [x1, y1, x2, y2],
        });
    }

    Ok(predictions)
}

/// Class-aware Non-Maximum Suppression. Survivors come out by descending score.
pub fn apply_nms(mut predictions: Vec<Prediction>, iou_threshold: f32, max_detections: usize) -> Vec<Prediction> {
    predictions.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

    let mut keep: Vec<Prediction> = Vec::new();
    for candidate in predictions {
        if keep.len() >= max_detections {
            break;
        }
        let suppressed = keep
            .iter()
            .any(|k| k.class_id == candidate.class_id && compute_iou(&k.bbox, &candidate.bbox) > iou_threshold);
        if !suppressed {
            keep.push(candidate);
        }
    }

    keep
}

/// IoU of two `[x1, y1, x2, y2]` boxes
pub fn compute_iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let inter_w = (a[2].min(b[2]) - a[0].max(b[0])).max(0.0);
    let inter_h = (a[3].min(b[3]) - a[1].max(b[1])).max(0.0);
    let inter = inter_w * inter_h;

    let area_a = (a[2] - a[0]).max(0.0) * (a[3] - a[1]).max(0.0);
    let area_b = (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0);
    let union = area_a + area_b - inter;

    if union <= 0.0 || !union.is_finite() {
        return 0.0;
    }
    inter / union
}
