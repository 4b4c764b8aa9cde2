//! WGSL generation for the effect pipeline
//!
//! The fragment shader is assembled from one function per enabled stage and
//! a `fs_main` that calls them in plan order. The uniform block is the same
//! for every variant, so a single bind group layout serves all pipelines.

use bytemuck::{Pod, Zeroable};
use phosphor_core::EffectParameters;

use crate::stages::{
    GLITCH_FRAME_RATE, GLITCH_MAX_SHIFT, GLITCH_PROBABILITY, GLITCH_ROWS, NOISE_TIME_SCALE,
    SCANLINE_SCROLL_SPEED, Stage, StagePlan,
};

/// Uniform block shared by every generated shader
///
/// Field order and padding match the WGSL `Params` struct (64 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CrtUniforms {
    pub resolution: [f32; 2],
    pub texel_size: [f32; 2],
    pub clear_color: [f32; 4],
    pub distortion: f32,
    pub zoom: f32,
    pub time: f32,
    pub noise_amount: f32,
    pub scanline_intensity: f32,
    pub scanline_frequency: f32,
    pub blur_amount: f32,
    pub glitch_intensity: f32,
}

impl CrtUniforms {
    /// Pack sanitized parameters for one draw
    pub fn new(
        params: &EffectParameters,
        time: f32,
        target_size: (u32, u32),
        source_size: (u32, u32),
    ) -> Self {
        let p = params.sanitized();
        Self {
            resolution: [target_size.0 as f32, target_size.1 as f32],
            texel_size: [1.0 / source_size.0.max(1) as f32, 1.0 / source_size.1.max(1) as f32],
            clear_color: p.clear_color().to_array(),
            distortion: p.distortion,
            zoom: p.zoom,
            time,
            noise_amount: p.noise_amount,
            scanline_intensity: p.scanline_intensity,
            scanline_frequency: phosphor_core::params::scanline_frequency(target_size.1),
            blur_amount: p.blur_amount,
            glitch_intensity: p.glitch_intensity,
        }
    }
}

/// Generates WGSL shader code for a stage plan
pub struct ShaderGenerator;

impl ShaderGenerator {
    /// Generate a complete shader module for `plan`
    pub fn generate(plan: &StagePlan) -> String {
        let mut shader = String::new();

        shader.push_str("// Generated CRT shader\n");
        shader.push_str("// Stages: ");
        let names: Vec<_> = plan.stages().iter().map(|s| format!("{:?}", s)).collect();
        shader.push_str(&names.join(", "));
        shader.push_str("\n\n");

        shader.push_str(Self::uniforms());
        shader.push_str(Self::vertex_shader());
        shader.push_str(Self::hash_function());

        for stage in plan.stages() {
            if let Some(function) = Self::stage_function(*stage) {
                shader.push_str(&function);
            }
        }

        shader.push_str(&Self::fragment_shader(plan));
        shader
    }

    /// Debug label for the pipeline built from `plan`
    pub fn label(plan: &StagePlan) -> String {
        format!("CRT Shader {:#07b}", plan.key())
    }

    fn uniforms() -> &'static str {
        r#"struct Params {
    resolution: vec2<f32>,
    texel_size: vec2<f32>,
    clear_color: vec4<f32>,
    distortion: f32,
    zoom: f32,
    time: f32,
    noise_amount: f32,
    scanline_intensity: f32,
    scanline_frequency: f32,
    blur_amount: f32,
    glitch_intensity: f32,
}

@group(0) @binding(0) var<uniform> params: Params;
@group(0) @binding(1) var source_texture: texture_2d<f32>;
@group(0) @binding(2) var source_sampler: sampler;

"#
    }

    fn vertex_shader() -> &'static str {
        r#"struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(@builtin(vertex_index) vertex_index: u32) -> VertexOutput {
    var result: VertexOutput;
    let x = f32(i32(vertex_index & 1u)) * 4.0 - 1.0;
    let y = f32(i32(vertex_index >> 1u)) * 4.0 - 1.0;
    result.position = vec4<f32>(x, y, 0.0, 1.0);
    result.uv = vec2<f32>((x + 1.0) * 0.5, (1.0 - y) * 0.5);
    return result;
}

"#
    }

    fn hash_function() -> &'static str {
        r#"fn hash(p: vec2<f32>) -> f32 {
    return fract(sin(dot(p, vec2<f32>(12.9898, 78.233))) * 43758.5453);
}

"#
    }

    fn stage_function(stage: Stage) -> Option<String> {
        let source = match stage {
            Stage::BarrelDistortion => r#"fn barrel_distort(uv: vec2<f32>) -> vec2<f32> {
    let r = (uv - vec2<f32>(0.5)) * params.zoom;
    let factor = 1.0 + params.distortion * dot(r, r);
    return r * factor / params.zoom + vec2<f32>(0.5);
}

fn in_unit_square(uv: vec2<f32>) -> bool {
    return all(uv >= vec2<f32>(0.0)) && all(uv <= vec2<f32>(1.0));
}

"#
            .to_string(),
            Stage::GlitchDisplacement => format!(
                r#"fn glitch_displace(uv: vec2<f32>) -> vec2<f32> {{
    let frame = floor(params.time * {rate:.1});
    let row = floor(uv.y * {rows:.1});
    var shifted = uv;
    if (hash(vec2<f32>(frame, row)) < params.glitch_intensity * {probability}) {{
        shifted.x = shifted.x + (hash(vec2<f32>(row, frame)) - 0.5) * {span};
    }}
    return shifted;
}}

"#,
                rate = GLITCH_FRAME_RATE,
                rows = GLITCH_ROWS,
                probability = wgsl_float(GLITCH_PROBABILITY),
                span = wgsl_float(2.0 * GLITCH_MAX_SHIFT),
            ),
            Stage::PointSample => return None,
            Stage::BoxBlur => r#"fn box_blur(uv: vec2<f32>) -> vec4<f32> {
    let offset = params.texel_size * params.blur_amount;
    var sum = vec4<f32>(0.0);
    for (var i = -1; i <= 1; i = i + 1) {
        for (var j = -1; j <= 1; j = j + 1) {
            let tap = uv + vec2<f32>(f32(i), f32(j)) * offset;
            sum = sum + textureSampleLevel(source_texture, source_sampler, tap, 0.0);
        }
    }
    return sum / 9.0;
}

"#
            .to_string(),
            Stage::ScanlineNoise => format!(
                r#"fn scanline_noise(color: vec4<f32>, uv: vec2<f32>, screen_uv: vec2<f32>) -> vec4<f32> {{
    let scanline = sin((uv.y + params.time * {scroll}) * params.scanline_frequency) * params.scanline_intensity;
    let noise = (hash(screen_uv + vec2<f32>(params.time * {noise_scale})) - 0.5) * params.noise_amount;
    let rgb = clamp(color.rgb - vec3<f32>(scanline) + vec3<f32>(noise), vec3<f32>(0.0), vec3<f32>(1.0));
    return vec4<f32>(rgb, color.a);
}}

"#,
                scroll = wgsl_float(SCANLINE_SCROLL_SPEED),
                noise_scale = wgsl_float(NOISE_TIME_SCALE),
            ),
        };
        Some(source)
    }

    fn fragment_shader(plan: &StagePlan) -> String {
        let mut s = String::from(
            "@fragment\nfn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {\n",
        );
        s.push_str("    var uv = in.uv;\n");
        s.push_str("    var color = params.clear_color;\n");

        for stage in plan.stages() {
            let call = match stage {
                Stage::BarrelDistortion => {
                    "    uv = barrel_distort(uv);\n    if (!in_unit_square(uv)) {\n        return params.clear_color;\n    }\n"
                }
                Stage::GlitchDisplacement => {
                    "    uv = glitch_displace(uv);\n    if (!in_unit_square(uv)) {\n        return params.clear_color;\n    }\n"
                }
                Stage::PointSample => {
                    "    color = textureSampleLevel(source_texture, source_sampler, uv, 0.0);\n"
                }
                Stage::BoxBlur => "    color = box_blur(uv);\n",
                Stage::ScanlineNoise => "    color = scanline_noise(color, uv, in.uv);\n",
            };
            s.push_str(call);
        }

        s.push_str("    return color;\n}\n");
        s
    }
}

/// Format a constant so WGSL parses it as an f32 literal
fn wgsl_float(value: f32) -> String {
    let text = format!("{}", value);
    if text.contains('.') || text.contains('e') {
        text
    } else {
        format!("{}.0", text)
    }
}
