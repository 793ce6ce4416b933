// SPDX-License-Identifier: MIT OR Apache-2.0
//! Embedded support-library fragments.
//!
//! These fragments are registered as in-memory sources so that include
//! directives resolve without an install path. User source files still
//! resolve through the context's filesystem search paths.

use crate::context::GenContext;

/// Global constants and macros, GLSL.
pub const MX_DEFINES_GLSL: &str = "\
#define M_PI 3.1415926535897932
#define M_PI_INV (1.0 / M_PI)
#define M_FLOAT_EPS 1e-8
";

/// Common math helpers, GLSL.
pub const MX_MATH_GLSL: &str = "\
float mx_square(float x)
{
    return x*x;
}

vec2 mx_square(vec2 x)
{
    return x*x;
}

vec3 mx_square(vec3 x)
{
    return x*x;
}

float mx_pow5(float x)
{
    return mx_square(mx_square(x)) * x;
}
";

/// Specular environment via prefiltered maps, GLSL.
pub const MX_ENVIRONMENT_PREFILTER_GLSL: &str = "\
vec3 mx_environment_specular(vec3 N, vec3 V, float roughness)
{
    vec3 L = reflect(-V, N);
    return textureLod(u_envRadianceSampler, L, roughness * 8.0).rgb;
}

vec3 mx_environment_irradiance(vec3 N)
{
    return texture(u_envIrradianceSampler, N).rgb;
}
";

/// Specular environment via filtered importance sampling, GLSL.
pub const MX_ENVIRONMENT_FIS_GLSL: &str = "\
vec3 mx_environment_specular(vec3 N, vec3 V, float roughness)
{
    vec3 radiance = vec3(0.0);
    for (int i = 0; i < 16; ++i)
    {
        vec3 L = reflect(-V, N);
        radiance += textureLod(u_envRadianceSampler, L, roughness * 8.0).rgb;
    }
    return radiance / 16.0;
}

vec3 mx_environment_irradiance(vec3 N)
{
    return texture(u_envIrradianceSampler, N).rgb;
}
";

/// 2D convolution sampling helpers, GLSL.
pub const MX_SAMPLING_GLSL: &str = "\
void mx_get_sample_offsets(vec2 uv, vec2 texel, out vec2 offsets[9])
{
    offsets[0] = uv + vec2(-texel.x, -texel.y);
    offsets[1] = uv + vec2(0.0, -texel.y);
    offsets[2] = uv + vec2(texel.x, -texel.y);
    offsets[3] = uv + vec2(-texel.x, 0.0);
    offsets[4] = uv;
    offsets[5] = uv + vec2(texel.x, 0.0);
    offsets[6] = uv + vec2(-texel.x, texel.y);
    offsets[7] = uv + vec2(0.0, texel.y);
    offsets[8] = uv + vec2(texel.x, texel.y);
}
";

/// UV transform with vertical flip, GLSL.
pub const MX_GET_TARGET_UV_VFLIP_GLSL: &str = "\
vec2 mx_get_target_uv(vec2 uv)
{
    return vec2(uv.x, 1.0 - uv.y);
}
";

/// UV transform without flip, GLSL.
pub const MX_GET_TARGET_UV_NOOP_GLSL: &str = "\
vec2 mx_get_target_uv(vec2 uv)
{
    return uv;
}
";

/// Common math helpers, OSL.
pub const MX_MATH_OSL: &str = "\
float mx_square(float x)
{
    return x*x;
}

color mx_square(color x)
{
    return x*x;
}
";

/// Register the GLSL support library into a context.
pub fn register_glsl_library(ctx: &mut GenContext) {
    ctx.register_source("pbrlib/glsl/lib/mx_defines.glsl", MX_DEFINES_GLSL);
    ctx.register_source("pbrlib/glsl/lib/mx_math.glsl", MX_MATH_GLSL);
    ctx.register_source(
        "pbrlib/glsl/lib/mx_environment_prefilter.glsl",
        MX_ENVIRONMENT_PREFILTER_GLSL,
    );
    ctx.register_source(
        "pbrlib/glsl/lib/mx_environment_fis.glsl",
        MX_ENVIRONMENT_FIS_GLSL,
    );
    ctx.register_source("stdlib/glsl/lib/mx_sampling.glsl", MX_SAMPLING_GLSL);
    ctx.register_source(
        "stdlib/glsl/lib/mx_get_target_uv_vflip.glsl",
        MX_GET_TARGET_UV_VFLIP_GLSL,
    );
    ctx.register_source(
        "stdlib/glsl/lib/mx_get_target_uv_noop.glsl",
        MX_GET_TARGET_UV_NOOP_GLSL,
    );
}

/// Register the OSL support library into a context.
pub fn register_osl_library(ctx: &mut GenContext) {
    ctx.register_source("stdlib/osl/lib/mx_math.osl", MX_MATH_OSL);
}
