//! Application listing, launching and closing.

use std::sync::Arc;

use serde_json::{Map, Value, json};

use crate::command::{Converter, ResponseListener, Subscription, raw_payload};
use crate::error::Error;
use crate::protocol::{AppInfo, LaunchSession, LaunchSessionType};

use super::{WebOsTv, field, reject};

// ============================================================================
// Endpoints
// ============================================================================

const LIST_APPS: &str = "ssap://com.webos.applicationManager/listApps";
const FOREGROUND_APP: &str = "ssap://com.webos.applicationManager/getForegroundAppInfo";
const LAUNCH: &str = "ssap://system.launcher/launch";
const OPEN: &str = "ssap://system.launcher/open";
const CLOSE_APP: &str = "ssap://system.launcher/close";
const CLOSE_MEDIA: &str = "ssap://media.viewer/close";
const CLOSE_WEB_APP: &str = "ssap://webapp/closeWebApp";

// ============================================================================
// Launcher
// ============================================================================

/// Application management.
pub trait Launcher {
    /// Lists installed applications.
    fn get_app_list(&self, listener: ResponseListener<Vec<AppInfo>>);

    /// Launches `app_id`. An empty id is rejected.
    fn launch_app(&self, app_id: &str, listener: ResponseListener<LaunchSession>);

    /// Launches `app_id` with launch parameters.
    ///
    /// A `contentId` inside `params` is also sent at the top level, which
    /// some apps require for deep links.
    fn launch_app_with_params(
        &self,
        app_id: &str,
        params: Value,
        listener: ResponseListener<LaunchSession>,
    );

    /// Opens `url` in the built-in browser.
    fn launch_browser(&self, url: &str, listener: ResponseListener<LaunchSession>);

    /// Closes something previously launched.
    ///
    /// Sessions of type [`LaunchSessionType::Unknown`] cannot be closed and
    /// are reported as an argument error.
    fn close_launch_session(&self, session: &LaunchSession, listener: ResponseListener<Value>);

    /// Reads the foreground application.
    fn get_running_app(&self, listener: ResponseListener<AppInfo>);

    /// Receives every foreground application change.
    fn subscribe_running_app(
        &self,
        listener: ResponseListener<AppInfo>,
    ) -> Arc<Subscription<AppInfo>>;
}

fn launch_converter(app_id: String) -> Converter<LaunchSession> {
    Box::new(move |payload| {
        let session = LaunchSession::from_launch_response(payload, Some(&app_id))?;
        Ok(LaunchSession {
            app_id: app_id.clone(),
            ..session
        })
    })
}

fn foreground_converter() -> Converter<AppInfo> {
    Box::new(|payload| {
        let app: AppInfo = serde_json::from_value(payload.clone())
            .map_err(|e| Error::payload(format!("foreground app: {e}")))?;
        if app.id.is_empty() {
            return Err(Error::payload("foreground app has no id"));
        }
        Ok(app)
    })
}

impl WebOsTv {
    fn launch(&self, app_id: &str, params: Option<Value>, listener: ResponseListener<LaunchSession>) {
        if app_id.is_empty() {
            reject(&listener, "app id must not be empty");
            return;
        }

        let mut payload = Map::new();
        payload.insert("id".into(), Value::String(app_id.to_string()));
        if let Some(params) = params {
            if let Some(content_id) = params.get("contentId").and_then(Value::as_str) {
                payload.insert("contentId".into(), Value::String(content_id.to_string()));
            }
            payload.insert("params".into(), params);
        }

        self.request(
            LAUNCH,
            Some(Value::Object(payload)),
            launch_converter(app_id.to_string()),
            listener,
        );
    }
}

impl Launcher for WebOsTv {
    fn get_app_list(&self, listener: ResponseListener<Vec<AppInfo>>) {
        self.request(LIST_APPS, None, field("apps"), listener);
    }

    fn launch_app(&self, app_id: &str, listener: ResponseListener<LaunchSession>) {
        self.launch(app_id, None, listener);
    }

    fn launch_app_with_params(
        &self,
        app_id: &str,
        params: Value,
        listener: ResponseListener<LaunchSession>,
    ) {
        self.launch(app_id, Some(params), listener);
    }

    fn launch_browser(&self, url: &str, listener: ResponseListener<LaunchSession>) {
        self.request(
            OPEN,
            Some(json!({ "target": url })),
            Box::new(|payload| LaunchSession::from_launch_response(payload, None)),
            listener,
        );
    }

    fn close_launch_session(&self, session: &LaunchSession, listener: ResponseListener<Value>) {
        let (uri, payload) = match session.session_type {
            LaunchSessionType::App | LaunchSessionType::ExternalInputPicker => (
                CLOSE_APP,
                json!({ "id": session.app_id, "sessionId": session.session_id }),
            ),
            LaunchSessionType::Media => (
                CLOSE_MEDIA,
                json!({ "id": session.app_id, "sessionId": session.session_id }),
            ),
            LaunchSessionType::WebApp => (
                CLOSE_WEB_APP,
                json!({ "webAppId": session.app_id, "sessionId": session.session_id }),
            ),
            LaunchSessionType::Unknown => {
                reject(&listener, "cannot close a launch session of unknown type");
                return;
            }
        };
        self.request(uri, Some(payload), raw_payload(), listener);
    }

    fn get_running_app(&self, listener: ResponseListener<AppInfo>) {
        self.request(FOREGROUND_APP, None, foreground_converter(), listener);
    }

    fn subscribe_running_app(
        &self,
        listener: ResponseListener<AppInfo>,
    ) -> Arc<Subscription<AppInfo>> {
        self.subscribe(FOREGROUND_APP, None, foreground_converter(), listener)
    }
}

// ============================================================================
// Tests
// ============================================================================
