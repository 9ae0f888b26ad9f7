//! FastAPI Plugin
//!
//! Built-in template provider for FastAPI services.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::domain::plugin::{
    Capability, Plugin, PluginContext, PluginDescriptor, PluginError, PluginMetadata,
    PluginSource, TemplateProvider,
};
use std::sync::Arc;

pub const MODULE: &str = "fastapi";
pub const ENTRY: &str = "FastApiTemplates";

const MAIN_TEMPLATE: &str = r#"from fastapi import FastAPI
from fastapi.middleware.cors import CORSMiddleware

app = FastAPI(
    title="{{ app_name }}",
    description="{{ description }}",
    version="{{ version }}",
)

app.add_middleware(
    CORSMiddleware,
    allow_origins=["*"],
    allow_credentials=True,
    allow_methods=["*"],
    allow_headers=["*"],
)

{% for router in routers %}
from .routers import {{ router }}
app.include_router({{ router }}.router)
{% endfor %}


@app.get("/health")
async def health_check():
    return {"status": "healthy"}
"#;

const MODEL_TEMPLATE: &str = r#"from typing import Optional

from pydantic import {{ base_model }}


class {{ model_name }}({{ base_model }}):
{% for field_name, field_type in fields.items() %}
    {{ field_name }}: {{ field_type }}
{% endfor %}


class {{ model_name }}Create({{ base_model }}):
{% for field_name, field_type in fields.items() %}
    {{ field_name }}: {{ field_type }}
{% endfor %}


class {{ model_name }}Update({{ base_model }}):
{% for field_name, field_type in fields.items() %}
    {{ field_name }}: Optional[{{ field_type }}] = None
{% endfor %}
"#;

const ROUTER_TEMPLATE: &str = r#"from fastapi import APIRouter

router = APIRouter(prefix="{{ prefix }}", tags={{ tags }})

{% for endpoint in endpoints %}
@router.{{ endpoint.method }}("{{ endpoint.path }}")
async def {{ endpoint.name }}():
    return {"message": "{{ endpoint.name }} endpoint"}

{% endfor %}
"#;

const CRUD_TEMPLATE: &str = r#"from typing import List

from fastapi import APIRouter, Depends, HTTPException
from sqlalchemy.orm import Session

router = APIRouter()


@router.post("/", response_model={{ model_name }})
async def create_{{ model_name|lower }}(item: {{ model_name }}Create, db: Session = Depends(get_db)):
    return crud.create_{{ model_name|lower }}(db=db, item=item)


@router.get("/", response_model=List[{{ model_name }}])
async def read_{{ model_name|lower }}s(skip: int = 0, limit: int = 100, db: Session = Depends(get_db)):
    return crud.get_{{ model_name|lower }}s(db, skip=skip, limit=limit)


@router.get("/{item_id}", response_model={{ model_name }})
async def read_{{ model_name|lower }}(item_id: int, db: Session = Depends(get_db)):
    item = crud.get_{{ model_name|lower }}(db, item_id=item_id)
    if item is None:
        raise HTTPException(status_code=404, detail="Item not found")
    return item
"#;

/// FastAPI template plugin
#[derive(Debug)]
pub struct FastApiPlugin {
    metadata: PluginMetadata,
}

impl FastApiPlugin {
    pub fn new() -> Self {
        Self {
            metadata: metadata(),
        }
    }
}

impl Default for FastApiPlugin {
    fn default() -> Self {
        Self::new()
    }
}

fn metadata() -> PluginMetadata {
    PluginMetadata::new("FastAPI", "1.0.0")
        .with_description("FastAPI app, Pydantic model, router and CRUD templates")
        .with_author("PMP Codegen")
        .with_dependency("templates")
}

/// Registry entry for this plugin
pub fn descriptor() -> PluginDescriptor {
    PluginDescriptor::new(
        format!("{}.{}", MODULE, ENTRY),
        metadata(),
        vec![Capability::TemplateProvider],
        PluginSource::Builtin,
        || Ok(Arc::new(FastApiPlugin::new()) as Arc<dyn Plugin>),
    )
}

#[async_trait]
impl Plugin for FastApiPlugin {
    fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::TemplateProvider]
    }

    async fn initialize(&self, _context: PluginContext) -> Result<(), PluginError> {
        Ok(())
    }

    async fn cleanup(&self) -> Result<(), PluginError> {
        Ok(())
    }

    fn as_template_provider(&self) -> Option<&dyn TemplateProvider> {
        Some(self)
    }
}

#[async_trait]
impl TemplateProvider for FastApiPlugin {
    async fn templates(&self) -> Result<HashMap<String, String>, PluginError> {
        Ok(HashMap::from([
            ("fastapi_main".to_string(), MAIN_TEMPLATE.to_string()),
            ("fastapi_model".to_string(), MODEL_TEMPLATE.to_string()),
            ("fastapi_router".to_string(), ROUTER_TEMPLATE.to_string()),
            ("fastapi_crud".to_string(), CRUD_TEMPLATE.to_string()),
        ]))
    }
}
