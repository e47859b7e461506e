//! WiFi station component.

use ember_codegen::scheduler::StartFn;
use ember_codegen::{Define, Expression, Handle, Library, Resume, Statement};
use ember_config::schema::{self, Schema, Validator};
use ember_config::{ConfigValue, Invalid, PathKey, ValidationErrors, ValueKind};

use crate::component::Component;

fn manual_ip_schema() -> Validator {
    Schema::new()
        .required("static_ip", schema::ipv4())
        .required("gateway", schema::ipv4())
        .required("subnet", schema::ipv4())
        .optional("dns1", schema::ipv4())
        .optional("dns2", schema::ipv4())
        .into_validator()
}

pub struct WifiComponent;

impl Component for WifiComponent {
    fn domain(&self) -> &'static str {
        "wifi"
    }

    fn schema(&self) -> Option<Validator> {
        Some(
            Schema::new()
                .generate_id("id", "wifi::WiFiComponent")
                .required("ssid", schema::string())
                .optional_default("password", schema::string(), ConfigValue::string(""))
                .optional("use_address", schema::string())
                .optional("manual_ip", manual_ip_schema())
                .optional_default("domain", schema::string(), ConfigValue::string(".local"))
                .into_validator(),
        )
    }

    fn priority(&self) -> f64 {
        40.0
    }

    fn final_validate(&self, document: &ConfigValue) -> Result<(), ValidationErrors> {
        let ssid = document
            .get("wifi")
            .and_then(|stanza| stanza.get("ssid"))
            .and_then(|v| v.as_str());
        if ssid == Some("") {
            return Err(Invalid::new("ssid must not be empty")
                .prepend(PathKey::Key("ssid".to_string()))
                .prepend(PathKey::Key("wifi".to_string()))
                .into());
        }
        Ok(())
    }

    fn to_code(&self, config: ConfigValue) -> StartFn {
        Box::new(move |ctx| {
            let id = config
                .get("id")
                .and_then(|v| v.as_ident())
                .cloned()
                .ok_or_else(|| ember_codegen::Error::component("wifi", "missing id"))?;
            let name = id
                .name()
                .ok_or_else(|| ember_codegen::Error::component("wifi", "unresolved id"))?
                .to_string();
            let ssid = config
                .get("ssid")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let password = config
                .get("password")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();

            let domain = config
                .get("domain")
                .and_then(|v| v.as_str())
                .unwrap_or(".local");
            let address = match config.get("use_address").and_then(|v| v.as_str()) {
                Some(addr) => addr.to_string(),
                None => format!("{}{}", ctx.name(), domain),
            };
            ctx.set_address(address);

            ctx.add(Statement::include("wifi/wifi_component.h"));
            ctx.add(Statement::Declaration {
                type_tag: "wifi::WiFiComponent".to_string(),
                pointer: true,
                name: name.clone(),
                rhs: Expression::call("new wifi::WiFiComponent", vec![]),
            });
            let handle = Handle::pointer(name.clone());
            ctx.add(Statement::expr(Expression::call(
                handle.member("set_ssid"),
                vec![Expression::string(ssid)],
            )));
            if !password.is_empty() {
                ctx.add(Statement::expr(Expression::call(
                    handle.member("set_password"),
                    vec![Expression::string(password)],
                )));
            }
            if let Some(manual) = config.get("manual_ip") {
                ctx.add(Statement::expr(Expression::call(
                    handle.member("set_manual_ip"),
                    vec![Expression::raw(manual_ip_expr(manual))],
                )));
            }
            ctx.add(Statement::expr(Expression::call(
                handle.member("pre_setup"),
                vec![],
            )));

            ctx.add_define(Define::flag("USE_WIFI"));
            ctx.add_library(Library::new("WiFi", None, None))?;
            ctx.register_variable(id, handle)?;
            Ok(Resume::Done)
        })
    }
}

fn manual_ip_expr(manual: &ConfigValue) -> String {
    let ip = |key: &str| -> String {
        match manual.get(key).map(|v| &v.kind) {
            Some(ValueKind::Ipv4(ip)) => format!("IPAddress({})", dotted_args(&ip.to_string())),
            _ => "IPAddress()".to_string(),
        }
    };
    format!(
        "wifi::ManualIP{{{}, {}, {}, {}, {}}}",
        ip("static_ip"),
        ip("gateway"),
        ip("subnet"),
        ip("dns1"),
        ip("dns2")
    )
}

fn dotted_args(dotted: &str) -> String {
    dotted.split('.').collect::<Vec<_>>().join(", ")
}
