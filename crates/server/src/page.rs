use crate::handler::{FormValues, MapView, PageError};
use commute_flows::{render::FlowMap, Radius};
use liquid::{ParserBuilder, Template};
use log::warn;

const INDEX: &str = include_str!("../templates/index.liquid");

/// The sidebar and map, parsed once at startup.
pub struct Page {
    template: Template,
}

impl Page {
    pub fn new() -> Result<Self, liquid::Error> {
        let template = ParserBuilder::with_stdlib().build()?.parse(INDEX)?;
        Ok(Self { template })
    }

    pub fn render(
        &self,
        form: &FormValues,
        outcome: &Result<MapView, PageError>,
    ) -> Result<String, liquid::Error> {
        let (status, error, map_json) = match outcome {
            Ok(view) => (view.status.clone(), String::new(), embed(&view.map)),
            Err(error) => (String::new(), error.to_string(), "null".to_string()),
        };

        let globals = liquid::object!({
            "theme": form.theme.clone(),
            "city": form.city.clone(),
            "radius": form.radius.clone(),
            "show_nodes": form.show_nodes,
            "radius_min": Radius::MIN,
            "radius_max": Radius::MAX,
            "radius_step": Radius::STEP,
            "status": status,
            "error": error,
            "map_json": map_json,
        });

        self.template.render(&globals)
    }
}

/// Serializes the map for an inline `<script>`.
fn embed(map: &FlowMap) -> String {
    match serde_json::to_string(map) {
        Ok(json) => json.replace("</", "<\\/"),
        Err(error) => {
            warn!("serializing the map failed: {error}");
            "null".to_string()
        }
    }
}
