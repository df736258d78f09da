use super::DashboardManager;
use crate::ipc::wsfe;
use crate::models::ParamsRequest;
use crate::network::ApiError;
use crate::render::format::format_json;
use crate::render::Panel;
use serde_json::{json, Value};
use std::fmt;
use tracing::{error, info};

#[derive(Debug)]
pub enum LookupError {
    InvalidCuit,
    Api(ApiError),
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupError::InvalidCuit => write!(f, "Please enter a valid CUIT."),
            LookupError::Api(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for LookupError {}

fn skipped(message: &str) -> Value {
    json!({ "status": "skipped", "message": message })
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

impl DashboardManager {
    /// Points of sale registered for `cuit`. Renders its own success or failure.
    pub async fn lookup_points_of_sale(&self, cuit: i64) -> Result<Value, LookupError> {
        if cuit == 0 {
            self.renderer
                .render_wsfe(Panel::WsfePos, &LookupError::InvalidCuit.to_string());
            self.renderer.commit();
            return Err(LookupError::InvalidCuit);
        }

        let payload = json!({ "Cuit": cuit });
        let result = self
            .api
            .post_json::<Value>(wsfe::PUNTOS_VENTA, Some(&payload))
            .await;
        let outcome = match result {
            Ok(puntos_venta) => {
                let doc = json!({ "cuit": cuit, "puntos_venta": puntos_venta });
                self.renderer.render_wsfe(Panel::WsfePos, &format_json(&doc));
                Ok(doc)
            }
            Err(e) => {
                error!("[WSFE] POS lookup for {} failed: {}", cuit, e);
                self.renderer
                    .render_wsfe(Panel::WsfePos, &format!("WSFE POS refresh failed: {}", e));
                Err(LookupError::Api(e))
            }
        };
        self.renderer.commit();
        outcome
    }

    /// Combined WSFE parameter snapshot. Optional invoice lookups are replaced
    /// by `skipped` placeholders when their inputs are missing.
    pub async fn lookup_params_snapshot(&self, request: &ParamsRequest) -> Result<Value, LookupError> {
        if request.cuit == 0 {
            self.renderer
                .render_wsfe(Panel::WsfeParams, &LookupError::InvalidCuit.to_string());
            self.renderer.commit();
            return Err(LookupError::InvalidCuit);
        }

        let outcome = match self.fetch_params_snapshot(request).await {
            Ok(doc) => {
                info!("[WSFE] Params snapshot fetched for {}", request.cuit);
                self.renderer.render_wsfe(Panel::WsfeParams, &format_json(&doc));
                Ok(doc)
            }
            Err(e) => {
                error!("[WSFE] Params snapshot for {} failed: {}", request.cuit, e);
                self.renderer.render_wsfe(
                    Panel::WsfeParams,
                    &format!("WSFE params refresh failed: {}", e),
                );
                Err(LookupError::Api(e))
            }
        };
        self.renderer.commit();
        outcome
    }

    async fn fetch_params_snapshot(&self, request: &ParamsRequest) -> Result<Value, ApiError> {
        let cuit = request.cuit;
        let mon_id = non_blank(request.mon_id.as_deref()).unwrap_or("USD");
        let mut cotizacion_payload = json!({ "Cuit": cuit, "MonId": mon_id });
        if let Some(fch) = non_blank(request.fch_cotiz.as_deref()) {
            cotizacion_payload["FchCotiz"] = json!(fch);
        }
        let cuit_payload = json!({ "Cuit": cuit });
        let has_invoice_key = request.pto_vta != 0 && request.cbte_tipo != 0;
        let last_payload = json!({
            "Cuit": cuit,
            "PtoVta": request.pto_vta,
            "CbteTipo": request.cbte_tipo,
        });

        let last_authorized = async {
            if has_invoice_key {
                self.api
                    .post_json::<Value>(wsfe::LAST_AUTHORIZED, Some(&last_payload))
                    .await
            } else {
                Ok(skipped("Set PtoVta and CbteTipo to fetch last authorized."))
            }
        };

        let (cotizacion, concepto, opcional, paises, actividades, puntos_venta, last_authorized) = tokio::try_join!(
            self.api.post_json::<Value>(wsfe::COTIZACION, Some(&cotizacion_payload)),
            self.api.post_json::<Value>(wsfe::TYPES_CONCEPTO, Some(&cuit_payload)),
            self.api.post_json::<Value>(wsfe::TYPES_OPCIONAL, Some(&cuit_payload)),
            self.api.post_json::<Value>(wsfe::TYPES_PAISES, Some(&cuit_payload)),
            self.api.post_json::<Value>(wsfe::ACTIVIDADES, Some(&cuit_payload)),
            self.api.post_json::<Value>(wsfe::PUNTOS_VENTA, Some(&cuit_payload)),
            last_authorized,
        )?;

        let invoice_query = if has_invoice_key && request.cbte_nro != 0 {
            let payload = json!({
                "Cuit": cuit,
                "PtoVta": request.pto_vta,
                "CbteTipo": request.cbte_tipo,
                "CbteNro": request.cbte_nro,
            });
            self.api
                .post_json::<Value>(wsfe::INVOICE_QUERY, Some(&payload))
                .await?
        } else {
            skipped("Set CbteNro to query specific invoice.")
        };

        Ok(json!({
            "cuit": cuit,
            "puntos_venta": puntos_venta,
            "last_authorized": last_authorized,
            "invoice_query": invoice_query,
            "cotizacion": cotizacion,
            "types_concepto": concepto,
            "types_opcional": opcional,
            "types_paises": paises,
            "actividades": actividades,
        }))
    }
}
