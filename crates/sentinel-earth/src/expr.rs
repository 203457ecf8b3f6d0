//! Earth Engine expression graphs
//!
//! An [`Expr`] is a tree of function invocations over constants that the
//! Earth Engine REST API evaluates server-side. [`Expr::to_expression`]
//! flattens it into the `{result, values}` wire form; function bodies used by
//! `Collection.map` become separate entries referenced by key.

use std::collections::BTreeMap;

use sentinel_core::models::{DateRange, Polygon};
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Constant(Value),
    Call {
        function: &'static str,
        args: BTreeMap<&'static str, Expr>,
    },
    /// Reference to a parameter of the enclosing function
    Argument(&'static str),
    Dictionary(BTreeMap<String, Expr>),
    Function {
        params: Vec<&'static str>,
        body: Box<Expr>,
    },
}

impl Expr {
    pub fn constant(value: impl Into<Value>) -> Self {
        Expr::Constant(value.into())
    }

    pub fn call<const N: usize>(function: &'static str, args: [(&'static str, Expr); N]) -> Self {
        Expr::Call {
            function,
            args: BTreeMap::from(args),
        }
    }

    pub fn argument(name: &'static str) -> Self {
        Expr::Argument(name)
    }

    pub fn function(params: Vec<&'static str>, body: Expr) -> Self {
        Expr::Function {
            params,
            body: Box::new(body),
        }
    }

    pub fn dictionary<K: Into<String>>(entries: impl IntoIterator<Item = (K, Expr)>) -> Self {
        Expr::Dictionary(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Serialize into the REST `Expression` object
    pub fn to_expression(&self) -> Value {
        let mut writer = GraphWriter::default();
        let root = writer.node(self);
        let result = writer.push(root);
        json!({ "result": result, "values": Value::Object(writer.values) })
    }

    // Loading

    pub fn image_collection(id: &str) -> Self {
        Expr::call("ImageCollection.load", [("id", Expr::constant(id))])
    }

    pub fn image(id: &str) -> Self {
        Expr::call("Image.load", [("id", Expr::constant(id))])
    }

    /// Planar polygon from the closed `[lng, lat]` ring
    pub fn polygon(polygon: &Polygon) -> Self {
        Expr::call(
            "GeometryConstructors.Polygon",
            [("coordinates", Expr::constant(json!([polygon.ring()])))],
        )
    }

    // Filters

    pub fn filter_bounds(geometry: Expr) -> Self {
        Expr::call(
            "Filter.intersects",
            [("leftField", Expr::constant(".all")), ("rightValue", geometry)],
        )
    }

    /// Acquisitions in `[start, end)`, matching the client library's `filterDate`
    pub fn filter_date(range: &DateRange) -> Self {
        let range = Expr::call(
            "DateRange",
            [
                ("start", Expr::constant(range.start_str())),
                ("end", Expr::constant(range.end_str())),
            ],
        );
        Expr::call(
            "Filter.dateRangeContains",
            [("leftValue", range), ("rightField", Expr::constant("system:time_start"))],
        )
    }

    pub fn filter_lt(property: &str, value: impl Into<Value>) -> Self {
        Self::property_filter("Filter.lessThan", property, value.into())
    }

    pub fn filter_gt(property: &str, value: impl Into<Value>) -> Self {
        Self::property_filter("Filter.greaterThan", property, value.into())
    }

    pub fn filter_eq(property: &str, value: impl Into<Value>) -> Self {
        Self::property_filter("Filter.equals", property, value.into())
    }

    pub fn filter_list_contains(property: &str, value: impl Into<Value>) -> Self {
        Self::property_filter("Filter.listContains", property, value.into())
    }

    fn property_filter(function: &'static str, property: &str, value: Value) -> Self {
        Expr::call(
            function,
            [("leftField", Expr::constant(property)), ("rightValue", Expr::Constant(value))],
        )
    }

    // Collections

    pub fn filter(self, filter: Expr) -> Self {
        Expr::call("Collection.filter", [("collection", self), ("filter", filter)])
    }

    pub fn sort(self, property: &str, ascending: bool) -> Self {
        Expr::call(
            "Collection.limit",
            [
                ("collection", self),
                ("key", Expr::constant(property)),
                ("ascending", Expr::constant(ascending)),
            ],
        )
    }

    pub fn limit(self, count: usize) -> Self {
        Expr::call("Collection.limit", [("collection", self), ("limit", Expr::constant(count))])
    }

    pub fn first(self) -> Self {
        Expr::call("Collection.first", [("collection", self)])
    }

    pub fn merge(self, other: Expr) -> Self {
        Expr::call("Collection.merge", [("collection1", self), ("collection2", other)])
    }

    pub fn size(self) -> Self {
        Expr::call("Collection.size", [("collection", self)])
    }

    /// Apply a one-parameter function to every element
    pub fn map(self, function: Expr) -> Self {
        Expr::call("Collection.map", [("collection", self), ("baseAlgorithm", function)])
    }

    pub fn median(self) -> Self {
        Expr::call("reduce.median", [("collection", self)])
    }

    pub fn aggregate_array(self, property: &str) -> Self {
        Expr::call(
            "AggregateFeatureCollection.array",
            [("collection", self), ("property", Expr::constant(property))],
        )
    }

    // Images

    pub fn select(self, bands: &[&str]) -> Self {
        Expr::call(
            "Image.select",
            [("input", self), ("bandSelectors", Expr::constant(json!(bands)))],
        )
    }

    pub fn rename(self, names: &[&str]) -> Self {
        Expr::call("Image.rename", [("input", self), ("names", Expr::constant(json!(names)))])
    }

    /// Constant image from a number or a number-valued expression
    pub fn image_constant(value: Expr) -> Self {
        Expr::call("Image.constant", [("value", value)])
    }

    pub fn multiply(self, other: Expr) -> Self {
        Expr::call("Image.multiply", [("image1", self), ("image2", other)])
    }

    pub fn add(self, other: Expr) -> Self {
        Expr::call("Image.add", [("image1", self), ("image2", other)])
    }

    pub fn subtract(self, other: Expr) -> Self {
        Expr::call("Image.subtract", [("image1", self), ("image2", other)])
    }

    pub fn divide(self, other: Expr) -> Self {
        Expr::call("Image.divide", [("image1", self), ("image2", other)])
    }

    pub fn gt(self, other: Expr) -> Self {
        Expr::call("Image.gt", [("image1", self), ("image2", other)])
    }

    pub fn normalized_difference(self, bands: [&str; 2]) -> Self {
        Expr::call(
            "Image.normalizedDifference",
            [("input", self), ("bandNames", Expr::constant(json!(bands)))],
        )
    }

    pub fn clip(self, geometry: Expr) -> Self {
        Expr::call("Image.clip", [("input", self), ("geometry", geometry)])
    }

    pub fn pixel_area() -> Self {
        Expr::call("Image.pixelArea", [])
    }

    pub fn reduce_region(self, reducer: Expr, geometry: Expr, scale: f64) -> Self {
        Expr::call(
            "Image.reduceRegion",
            [
                ("image", self),
                ("reducer", reducer),
                ("geometry", geometry),
                ("scale", Expr::constant(scale)),
                ("maxPixels", Expr::constant(crate::indices::MAX_PIXELS)),
            ],
        )
    }

    // Reducers

    pub fn reducer(function: &'static str) -> Self {
        Expr::call(function, [])
    }

    /// Run both reducers over the same inputs, suffixing outputs with the reducer name
    pub fn combine(self, other: Expr) -> Self {
        Expr::call(
            "Reducer.combine",
            [
                ("reducer1", self),
                ("reducer2", other),
                ("sharedInputs", Expr::constant(true)),
            ],
        )
    }

    // Dictionaries and elements

    pub fn get(self, key: &str) -> Self {
        Expr::call("Dictionary.get", [("dictionary", self), ("key", Expr::constant(key))])
    }

    pub fn get_or(self, key: &str, default: impl Into<Value>) -> Self {
        Expr::call(
            "Dictionary.get",
            [
                ("dictionary", self),
                ("key", Expr::constant(key)),
                ("defaultValue", Expr::Constant(default.into())),
            ],
        )
    }

    pub fn property(self, name: &str) -> Self {
        Expr::call("Element.get", [("object", self), ("property", Expr::constant(name))])
    }

    pub fn set(self, key: &str, value: Expr) -> Self {
        Expr::call(
            "Element.set",
            [("object", self), ("key", Expr::constant(key)), ("value", value)],
        )
    }

    // Geometry

    pub fn area(self) -> Self {
        Expr::call("Geometry.area", [("geometry", self)])
    }

    pub fn buffer(self, meters: f64) -> Self {
        Expr::call("Geometry.buffer", [("geometry", self), ("distance", Expr::constant(meters))])
    }

    pub fn difference(self, other: Expr) -> Self {
        Expr::call("Geometry.difference", [("left", self), ("right", other)])
    }
}

#[derive(Default)]
struct GraphWriter {
    values: Map<String, Value>,
}

impl GraphWriter {
    fn push(&mut self, node: Value) -> String {
        let key = self.values.len().to_string();
        self.values.insert(key.clone(), node);
        key
    }

    fn node(&mut self, expr: &Expr) -> Value {
        match expr {
            Expr::Constant(value) => json!({ "constantValue": value }),
            Expr::Argument(name) => json!({ "argumentReference": name }),
            Expr::Call { function, args } => {
                let arguments: Map<String, Value> =
                    args.iter().map(|(name, arg)| (name.to_string(), self.node(arg))).collect();
                json!({
                    "functionInvocationValue": {
                        "functionName": function,
                        "arguments": arguments,
                    }
                })
            }
            Expr::Dictionary(entries) => {
                let values: Map<String, Value> =
                    entries.iter().map(|(key, value)| (key.clone(), self.node(value))).collect();
                json!({ "dictionaryValue": { "values": values } })
            }
            Expr::Function { params, body } => {
                let body = self.node(body);
                let body_ref = self.push(body);
                json!({
                    "functionDefinitionValue": {
                        "argumentNames": params,
                        "body": body_ref,
                    }
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_core::models::Coordinate;

    #[test]
    fn test_single_call_expression() {
        let expr = Expr::image_collection("COPERNICUS/S2_SR_HARMONIZED").size();
        assert_eq!(
            expr.to_expression(),
            json!({
                "result": "0",
                "values": {
                    "0": {
                        "functionInvocationValue": {
                            "functionName": "Collection.size",
                            "arguments": {
                                "collection": {
                                    "functionInvocationValue": {
                                        "functionName": "ImageCollection.load",
                                        "arguments": {"id": {"constantValue": "COPERNICUS/S2_SR_HARMONIZED"}}
                                    }
                                }
                            }
                        }
                    }
                }
            })
        );
    }

    #[test]
    fn test_function_bodies_are_referenced() {
        let body = Expr::argument("img").set("x", Expr::constant(1));
        let expr = Expr::image_collection("C").map(Expr::function(vec!["img"], body));
        let graph = expr.to_expression();

        assert_eq!(graph["result"], "1");
        let arguments = &graph["values"]["1"]["functionInvocationValue"]["arguments"];
        let definition = &arguments["baseAlgorithm"]["functionDefinitionValue"];
        assert_eq!(definition["argumentNames"], json!(["img"]));
        assert_eq!(definition["body"], "0");
        assert_eq!(
            graph["values"]["0"]["functionInvocationValue"]["arguments"]["object"],
            json!({"argumentReference": "img"})
        );
    }

    #[test]
    fn test_polygon_ring_is_closed() {
        let polygon = Polygon::new(vec![
            Coordinate::new(-1.0, -48.0),
            Coordinate::new(-1.0, -47.0),
            Coordinate::new(-2.0, -47.0),
        ])
        .unwrap();
        let graph = Expr::polygon(&polygon).to_expression();
        let coords = &graph["values"]["0"]["functionInvocationValue"]["arguments"]["coordinates"]
            ["constantValue"];
        assert_eq!(coords, &json!([[[-48.0, -1.0], [-47.0, -1.0], [-47.0, -2.0], [-48.0, -1.0]]]));
    }

    #[test]
    fn test_date_filter_uses_time_start() {
        let range = DateRange::parse("2024-01-01", "2024-02-01").unwrap();
        let graph = Expr::filter_date(&range).to_expression();
        let args = &graph["values"]["0"]["functionInvocationValue"]["arguments"];
        assert_eq!(args["rightField"], json!({"constantValue": "system:time_start"}));
        assert_eq!(
            args["leftValue"]["functionInvocationValue"]["arguments"]["end"],
            json!({"constantValue": "2024-02-01"})
        );
    }

    #[test]
    fn test_dictionary_values() {
        let expr = Expr::dictionary([("total", Expr::constant(3))]);
        assert_eq!(
            expr.to_expression()["values"]["0"],
            json!({"dictionaryValue": {"values": {"total": {"constantValue": 3}}}})
        );
    }
}
