use glam::Vec3;
use pbf_core::forces::{ForceId, SpringForce};
use pbf_core::{FluidSystem, ParticleHandle, SolverConfig, StepError};
use wasm_bindgen::prelude::*;

/// GPU-compatible particle struct: 16 bytes, matches the WGSL instance layout
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct GpuParticle {
    position: [f32; 3], // 12 bytes
    highlight: f32,     //  4 bytes (0.0 or 1.0)
}

#[wasm_bindgen]
pub struct FluidWorld {
    system: FluidSystem,
    gpu_buffer: Vec<GpuParticle>,
    drag: Option<ForceId>,
}

#[wasm_bindgen]
impl FluidWorld {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<FluidWorld, JsValue> {
        Self::with_config(SolverConfig::default())
    }

    /// Build from a TOML solver config.
    #[wasm_bindgen]
    pub fn from_toml(source: &str) -> Result<FluidWorld, JsValue> {
        let config = SolverConfig::from_toml_str(source).map_err(|e| JsValue::from_str(&e.to_string()))?;
        Self::with_config(config)
    }

    /// Fill the lower-left corner of the container with a block of fluid.
    #[wasm_bindgen]
    pub fn dam_break(&mut self, spacing: f32) -> usize {
        let created = self
            .system
            .fill_box(Vec3::splat(0.05), Vec3::new(0.4, 0.6, 0.4), spacing);
        web_sys::console::log_1(&format!("dam break: {} particles", created).into());
        self.write_gpu_output();
        created
    }

    #[wasm_bindgen]
    pub fn create_particle(&mut self, x: f32, y: f32, z: f32) -> usize {
        let handle = self.system.create_particle(Vec3::new(x, y, z));
        self.write_gpu_output();
        handle.index()
    }

    /// Advance one step. Returns the elapsed wall time in milliseconds.
    #[wasm_bindgen]
    pub fn advance(&mut self, dt: f32) -> Result<f32, JsValue> {
        let start = js_sys::Date::now();
        let result = self.system.advance(dt);
        self.write_gpu_output();
        match result {
            Ok(_) => Ok((js_sys::Date::now() - start) as f32),
            Err(e @ StepError::NonFiniteState { .. }) => {
                web_sys::console::error_1(&e.to_string().into());
                Err(JsValue::from_str(&e.to_string()))
            }
            Err(e) => Err(JsValue::from_str(&e.to_string())),
        }
    }

    #[wasm_bindgen]
    pub fn reset(&mut self) {
        self.clear_drag();
        self.system.reset();
        self.write_gpu_output();
    }

    /// Index of the particle nearest to the point, or -1 if there are none.
    #[wasm_bindgen]
    pub fn nearest_particle(&self, x: f32, y: f32, z: f32) -> i32 {
        self.system
            .nearest_particle(Vec3::new(x, y, z))
            .map_or(-1, |h| h.index() as i32)
    }

    #[wasm_bindgen]
    pub fn set_highlight(&mut self, index: usize, on: bool) {
        self.system.set_highlight(ParticleHandle(index), on);
        self.write_gpu_output();
    }

    /// Attach (or move) the mouse-drag spring to particle `index`.
    #[wasm_bindgen]
    pub fn set_drag(&mut self, index: usize, x: f32, y: f32, z: f32, stiffness: f32) {
        if let Some(id) = self.drag.take() {
            self.system.unregister_force(id);
        }
        if index >= self.system.particle_count() {
            return;
        }
        let spring = SpringForce::new(ParticleHandle(index), Vec3::new(x, y, z), stiffness)
            .with_damping(stiffness.sqrt());
        self.drag = Some(self.system.register_force(Box::new(spring)));
    }

    #[wasm_bindgen]
    pub fn clear_drag(&mut self) {
        if let Some(id) = self.drag.take() {
            self.system.unregister_force(id);
        }
    }

    #[wasm_bindgen]
    pub fn time(&self) -> f32 {
        self.system.time()
    }

    #[wasm_bindgen]
    pub fn particle_count(&self) -> usize {
        self.system.particle_count()
    }

    #[wasm_bindgen]
    pub fn get_gpu_buffer_ptr(&self) -> *const f32 {
        self.gpu_buffer.as_ptr() as *const f32
    }

    #[wasm_bindgen]
    pub fn get_gpu_buffer_byte_length(&self) -> usize {
        bytemuck::cast_slice::<GpuParticle, u8>(&self.gpu_buffer).len()
    }
}

impl FluidWorld {
    fn with_config(config: SolverConfig) -> Result<FluidWorld, JsValue> {
        let system = FluidSystem::new(config).map_err(|e| JsValue::from_str(&e.to_string()))?;
        web_sys::console::log_1(&"WASM FluidWorld created".into());
        Ok(FluidWorld {
            system,
            gpu_buffer: Vec::new(),
            drag: None,
        })
    }

    fn write_gpu_output(&mut self) {
        let particles = self.system.particles();
        self.gpu_buffer.clear();
        self.gpu_buffer.extend(
            particles
                .position
                .iter()
                .zip(&particles.highlight)
                .map(|(p, &h)| GpuParticle {
                    position: p.to_array(),
                    highlight: if h { 1.0 } else { 0.0 },
                }),
        );
    }
}
