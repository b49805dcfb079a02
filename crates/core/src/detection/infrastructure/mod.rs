pub mod onnx_classifier_loader;
pub mod onnx_expression_classifier;
pub mod onnx_face_locator;
