//! Prompt templates for the content service.

pub const PROMO_VIDEO_PROMPT: &str =
    "Cinematic promotional video for student travel, upbeat, sunny, diverse students.";

pub fn job_description_prompt(title: &str, requirements: &str) -> String {
    format!(
        "You are a program coordinator for the Summer Work Travel (SWT) USA program.\n\
         Write an exciting job description for a student summer job: \"{title}\".\n\
         Context/Requirements: {requirements}.\n\
         \n\
         Structure:\n\
         1. Job Highlight (The vibe of the workplace)\n\
         2. Duties & Responsibilities (Bullet points)\n\
         3. Perks (Housing, cultural exchange activities, etc.)\n\
         \n\
         Tone: Energetic, adventurous, appealing to international university students.\n\
         Language: Simplified Chinese (zh-CN) with some English keywords for job titles.\n\
         Keep it under 200 words. Markdown format."
    )
}

pub fn cover_image_prompt(prompt: &str) -> String {
    format!(
        "A photorealistic, bright, sunny summer job scene suitable for a travel brochure: \
         {prompt}. High quality, 4k."
    )
}
