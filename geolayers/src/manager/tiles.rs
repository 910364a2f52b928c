use serde_json::Value;
use url::form_urlencoded;

/// Tile URL template of an externally tiled raster.
///
/// Locators that already are templates (containing `{z}` or `{bbox-epsg-3857}`) are used as they
/// are. Anything else is taken as the root of an image service and expanded into an
/// `exportImage` request per tile, carrying the rendering rule when one is configured.
pub fn tile_template(locator: &str, rendering_rule: Option<&Value>, tile_size: u32) -> String {
    if locator.contains("{z}") || locator.contains("{bbox-epsg-3857}") {
        return locator.to_owned();
    }

    let root = locator.trim_end_matches('/');
    let mut template = format!(
        "{root}/exportImage?bbox={{bbox-epsg-3857}}&bboxSR=3857&imageSR=3857\
         &size={tile_size},{tile_size}&format=png&transparent=true&f=image"
    );

    if let Some(rule) = rendering_rule {
        template.push_str("&renderingRule=");
        template.extend(form_urlencoded::byte_serialize(rule.to_string().as_bytes()));
    }

    template
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn templates_pass_through() {
        let xyz = "https://tiles.example.org/landcover/{z}/{x}/{y}.png";
        assert_eq!(tile_template(xyz, None, 256), xyz);
    }

    #[test]
    fn image_service_gets_export_template() {
        let template = tile_template(
            "https://services.example.org/arcgis/rest/services/Landcover/ImageServer/",
            Some(&json!({"rasterFunction": "Colormap"})),
            512,
        );

        assert_eq!(
            template,
            "https://services.example.org/arcgis/rest/services/Landcover/ImageServer/exportImage\
             ?bbox={bbox-epsg-3857}&bboxSR=3857&imageSR=3857&size=512,512&format=png\
             &transparent=true&f=image&renderingRule=%7B%22rasterFunction%22%3A%22Colormap%22%7D"
        );
    }
}
