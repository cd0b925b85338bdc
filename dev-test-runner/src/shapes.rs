//! Shapes fixture: one capability with six variants (one a unit struct), and
//! records holding shapes as a plain field, a sequence, a mapping, next to a
//! skipped field, and behind shared pointers.
//!
//! `shapes_json` is generated from this file with
//! `polyjson rust -i dev-test-runner/src/shapes.rs -c Shape -o dev-test-runner/src/shapes/shapes_json.rs`.
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

mod shapes_json;
pub use shapes_json::*;

pub trait Shape: ShapeJson + std::fmt::Debug {
    fn xxx_shape(&self);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Triangle {
    pub p0: [i64; 2],
    pub p1: [i64; 2],
    pub p2: [i64; 2],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Square {
    pub top_left: [i64; 2],
    pub width: i64,
    pub height: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub vertices: Vec<[i64; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    pub center: [i64; 2],
    pub radius: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Empty;

/// A shape made of two others.
#[derive(Debug, Serialize, Deserialize)]
pub struct Union {
    pub a: Option<Box<dyn Shape>>,
    pub b: Option<Box<dyn Shape>>,
}

impl Shape for Triangle {
    fn xxx_shape(&self) {}
}

impl Shape for Square {
    fn xxx_shape(&self) {}
}

impl Shape for Polygon {
    fn xxx_shape(&self) {}
}

impl Shape for Circle {
    fn xxx_shape(&self) {}
}

impl Shape for Union {
    fn xxx_shape(&self) {}
}

impl Shape for Empty {
    fn xxx_shape(&self) {}
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Area {
    pub color: String,
    #[serde(rename = "region")]
    pub shape: Option<Box<dyn Shape>>,
}

#[derive(Debug)]
pub struct Pattern {
    pub size: i64,
    pub shapes: Vec<Option<Box<dyn Shape>>>,
}

#[derive(Debug)]
pub struct NamedPattern {
    pub sizes: BTreeMap<String, i64>,
    pub shapes: BTreeMap<String, Box<dyn Shape>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ShapeShifter {
    pub from: Option<Box<dyn Shape>>,
    pub to: Box<dyn Shape>,
    #[serde(skip)]
    pub skip_me: Option<Box<dyn Shape>>,
    pub err: String,
}

#[derive(Debug)]
pub struct Gallery {
    pub cover: Arc<dyn Shape>,
    pub pinned: Option<Rc<dyn Shape>>,
    pub shared: Vec<Arc<dyn Shape>>,
}
